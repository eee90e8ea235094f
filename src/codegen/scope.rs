//! Scoped state changes undone when the guard goes out of scope.
//!
//! Both guards restore what they replaced on every exit path, including an
//! early `?` return out of the lowering that created them.

use std::{collections::HashMap, ops::{Deref, DerefMut}};

use crate::{ir::SlotId, operators::OperatorTable};

/// Variable name to stack slot bindings visible while lowering a body.
#[derive(Debug, Default)]
pub struct ScopeTable {
	bindings: HashMap<String, SlotId>,
}

impl ScopeTable {
	pub fn lookup(&self, name: &str) -> Option<SlotId> { self.bindings.get(name).copied() }

	/// Bind `name`, returning the binding it shadows.
	pub fn bind(&mut self, name: String, slot: SlotId) -> Option<SlotId> { self.bindings.insert(name, slot) }

	pub fn restore(&mut self, name: String, previous: Option<SlotId>) {
		match previous {
			Some(slot) => {
				self.bindings.insert(name, slot);
			}
			None => {
				self.bindings.remove(&name);
			}
		}
	}
}

/// Shadows variables for the lifetime of the guard.
///
/// Derefs to the owner of the scope so lowering can continue through the
/// guard. Bindings are restored newest first, so binding one name twice in the
/// same guard still ends with the outer binding.
pub struct Shadowed<'a, T: AsMut<ScopeTable>> {
	owner: &'a mut T,
	saved: Vec<(String, Option<SlotId>)>,
}

impl<'a, T: AsMut<ScopeTable>> Shadowed<'a, T> {
	pub fn new(owner: &'a mut T) -> Self { Self { owner, saved: Vec::new() } }

	pub fn bind(&mut self, name: String, slot: SlotId) {
		let previous = self.owner.as_mut().bind(name.clone(), slot);
		self.saved.push((name, previous));
	}
}

impl<T: AsMut<ScopeTable>> Deref for Shadowed<'_, T> {
	type Target = T;

	fn deref(&self) -> &T { self.owner }
}

impl<T: AsMut<ScopeTable>> DerefMut for Shadowed<'_, T> {
	fn deref_mut(&mut self) -> &mut T { self.owner }
}

impl<T: AsMut<ScopeTable>> Drop for Shadowed<'_, T> {
	fn drop(&mut self) {
		let scope = self.owner.as_mut();
		while let Some((name, previous)) = self.saved.pop() {
			scope.restore(name, previous);
		}
	}
}

/// A binary operator precedence installed on trust: rolled back on drop
/// unless the definition it belongs to commits.
pub struct OperatorRegistration<'a> {
	table:     &'a mut OperatorTable,
	symbol:    char,
	previous:  Option<u32>,
	committed: bool,
}

impl<'a> OperatorRegistration<'a> {
	pub fn install(table: &'a mut OperatorTable, symbol: char, precedence: u32) -> Self {
		let previous = table.install(symbol, precedence);
		Self { table, symbol, previous, committed: false }
	}

	pub fn commit(mut self) { self.committed = true; }
}

impl Drop for OperatorRegistration<'_> {
	fn drop(&mut self) {
		if !self.committed {
			self.table.restore(self.symbol, self.previous);
		}
	}
}
