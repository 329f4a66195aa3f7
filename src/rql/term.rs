//! Arena-backed term tree.
//!
//! Every term of one query lives in a single [`TermArena`] and is addressed by a
//! [`TermId`]. Parent links are plain indices, so clause rewrites can swap a
//! subtree in place with [`TermArena::replace_child`] without any shared
//! ownership between parent and child.

use std::fmt;

/// Index of a term inside its arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TermId(usize);

impl TermId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// One RQL function call or literal.
#[derive(Debug, Clone, PartialEq)]
pub struct Term {
    token: String,
    quoted: bool,
    parent: Option<TermId>,
    children: Vec<TermId>,
}

impl Term {
    pub fn token(&self) -> &str {
        &self.token
    }

    /// True when the literal was written inside quotes.
    pub fn is_quoted(&self) -> bool {
        self.quoted
    }

    pub fn parent(&self) -> Option<TermId> {
        self.parent
    }

    pub fn children(&self) -> &[TermId] {
        &self.children
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Owner of every term produced while parsing and rewriting one query.
#[derive(Debug, Clone, Default)]
pub struct TermArena {
    terms: Vec<Term>,
}

impl TermArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Allocate a childless term.
    pub fn leaf(&mut self, token: impl Into<String>, quoted: bool) -> TermId {
        let id = TermId(self.terms.len());
        self.terms.push(Term {
            token: token.into(),
            quoted,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    /// Allocate a function term and adopt `children` in order.
    pub fn function(&mut self, token: impl Into<String>, children: Vec<TermId>) -> TermId {
        let id = self.leaf(token, false);
        for child in children {
            self.push_child(id, child);
        }
        id
    }

    /// Append `child` to `parent`, detaching it from any previous parent first.
    pub fn push_child(&mut self, parent: TermId, child: TermId) {
        self.detach(child);
        self.terms[child.0].parent = Some(parent);
        self.terms[parent.0].children.push(child);
    }

    /// Swap `old` for `new` in `parent`'s child list, keeping its position.
    ///
    /// Returns false when `old` is not a child of `parent`.
    pub fn replace_child(&mut self, parent: TermId, old: TermId, new: TermId) -> bool {
        let Some(position) = self.terms[parent.0].children.iter().position(|c| *c == old) else {
            return false;
        };
        self.detach(new);
        self.terms[parent.0].children[position] = new;
        self.terms[old.0].parent = None;
        self.terms[new.0].parent = Some(parent);
        true
    }

    /// Remove `id` from its parent's child list. The term itself stays allocated.
    pub fn detach(&mut self, id: TermId) {
        if let Some(parent) = self.terms[id.0].parent.take() {
            self.terms[parent.0].children.retain(|c| *c != id);
        }
    }

    pub fn get(&self, id: TermId) -> &Term {
        &self.terms[id.0]
    }

    pub fn token(&self, id: TermId) -> &str {
        &self.terms[id.0].token
    }

    pub fn children(&self, id: TermId) -> &[TermId] {
        &self.terms[id.0].children
    }

    pub fn child(&self, id: TermId, index: usize) -> Option<TermId> {
        self.terms[id.0].children.get(index).copied()
    }

    pub fn parent(&self, id: TermId) -> Option<TermId> {
        self.terms[id.0].parent
    }

    pub fn is_leaf(&self, id: TermId) -> bool {
        self.terms[id.0].children.is_empty()
    }

    /// First descendant-or-self (pre-order) whose token equals `token`.
    pub fn find(&self, root: TermId, token: &str) -> Option<TermId> {
        if !self.is_leaf(root) && self.token(root) == token {
            return Some(root);
        }
        self.children(root)
            .iter()
            .find_map(|child| self.find(*child, token))
    }

    /// Canonical RQL text for the subtree rooted at `id`.
    pub fn render(&self, id: TermId) -> String {
        let term = self.get(id);
        if term.is_leaf() {
            if term.quoted {
                return format!("'{}'", term.token.replace('\\', "\\\\").replace('\'', "\\'"));
            }
            return term.token.clone();
        }
        let args: Vec<String> = term.children.iter().map(|c| self.render(*c)).collect();
        format!("{}({})", term.token, args.join(","))
    }

    /// Borrow a subtree for `Display`.
    pub fn display(&self, id: TermId) -> TermDisplay<'_> {
        TermDisplay { arena: self, id }
    }
}

/// `Display` adapter produced by [`TermArena::display`].
pub struct TermDisplay<'a> {
    arena: &'a TermArena,
    id: TermId,
}

impl fmt::Display for TermDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.arena.render(self.id))
    }
}
