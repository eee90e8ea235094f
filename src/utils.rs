use std::{cell::{Ref, RefCell, RefMut}, io::Write, rc::Rc};

/// Shared handle to a mutable value, used for the sinks the session and the
/// host intrinsics write to. Cloning is shallow.
#[derive(Debug, Default)]
pub struct RcCell<T> {
	inner: Rc<RefCell<T>>,
}

impl<T> Clone for RcCell<T> {
	fn clone(&self) -> Self { Self { inner: self.inner.clone() } }
}

impl<T> RcCell<T> {
	pub fn new(value: T) -> Self { Self { inner: Rc::new(RefCell::new(value)) } }

	pub fn borrow(&self) -> Ref<'_, T> { self.inner.borrow() }

	pub fn borrow_mut(&self) -> RefMut<'_, T> { self.inner.borrow_mut() }
}

impl<T> From<T> for RcCell<T> {
	fn from(value: T) -> Self { Self::new(value) }
}

impl<W: Write> Write for RcCell<W> {
	fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> { self.inner.borrow_mut().write(buf) }

	fn flush(&mut self) -> std::io::Result<()> { self.inner.borrow_mut().flush() }
}

impl RcCell<Vec<u8>> {
	/// Lossy UTF-8 view of everything written so far.
	pub fn contents(&self) -> String { String::from_utf8_lossy(&self.inner.borrow()).into_owned() }
}
