use thiserror::Error;

/// Handle to one node inside a [`Document`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) usize);

/// Variant tag of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Null,
    Bool,
    Int,
    Float,
    Str,
    Array,
    Object,
}

/// A scalar value for allocation and editing.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl From<bool> for Scalar {
    fn from(v: bool) -> Self {
        Scalar::Bool(v)
    }
}
impl From<i64> for Scalar {
    fn from(v: i64) -> Self {
        Scalar::Int(v)
    }
}
impl From<i32> for Scalar {
    fn from(v: i32) -> Self {
        Scalar::Int(v as i64)
    }
}
impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Scalar::Float(v)
    }
}
impl From<&str> for Scalar {
    fn from(v: &str) -> Self {
        Scalar::Str(v.to_string())
    }
}
impl From<String> for Scalar {
    fn from(v: String) -> Self {
        Scalar::Str(v)
    }
}

#[derive(Debug, Error)]
pub enum DocError {
    #[error("node is already assigned to a container")]
    NodeAssigned,
    #[error("target node is not a container of the required kind")]
    NotAContainer,
}

#[derive(Debug, Clone)]
enum Payload {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Array(Vec<NodeId>),
    Object(Vec<NodeId>),
}

#[derive(Debug, Clone)]
struct Slot {
    parent: Option<NodeId>,
    name: String,
    payload: Payload,
}

impl Slot {
    fn detached(payload: Payload) -> Self {
        Self { parent: None, name: String::new(), payload }
    }
}

// Result of walking a dotted path: the deepest container reached, the node
// found at the stopping segment (if any), whether every prior segment
// resolved through containers, and the byte offset of the stopping segment.
pub(crate) struct Walk {
    pub container: NodeId,
    pub found: Option<NodeId>,
    pub matched: bool,
    pub resume: usize,
}

/// A mutable tree of typed nodes with dotted-path addressing.
///
/// Nodes live in a slot arena owned by the document and are referred to by
/// [`NodeId`]. A node knows its parent and its name: the member key under an
/// Object, or the positional index rendered as a string under an Array.
/// Array names are kept contiguous (`"0".."n-1"`) across every mutation.
#[derive(Debug, Clone)]
pub struct Document {
    slots: Vec<Slot>,
    root: NodeId,
}

impl Document {
    /// New document whose root is an empty Object.
    pub fn new_object() -> Self {
        let mut doc = Self::shell();
        let root = doc.alloc_object();
        doc.root = root;
        doc
    }

    /// New document whose root is an empty Array.
    pub fn new_array() -> Self {
        let mut doc = Self::shell();
        let root = doc.alloc_array();
        doc.root = root;
        doc
    }

    // Rootless shell for the reader to build into; not valid until a root
    // container has been allocated and set.
    pub(crate) fn shell() -> Self {
        Self { slots: Vec::new(), root: NodeId(0) }
    }

    pub(crate) fn set_root(&mut self, id: NodeId) {
        self.root = id;
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Total slots allocated over the document's life, including any that
    /// have since been replaced or removed.
    pub fn node_count(&self) -> usize {
        self.slots.len()
    }

    // ---- allocation ----

    fn alloc_slot(&mut self, payload: Payload) -> NodeId {
        let id = NodeId(self.slots.len());
        self.slots.push(Slot::detached(payload));
        id
    }

    /// Allocates a detached scalar node.
    pub fn alloc(&mut self, value: impl Into<Scalar>) -> NodeId {
        let payload = match value.into() {
            Scalar::Null => Payload::Null,
            Scalar::Bool(b) => Payload::Bool(b),
            Scalar::Int(i) => Payload::Int(i),
            Scalar::Float(f) => Payload::Float(f),
            Scalar::Str(s) => Payload::Str(s),
        };
        self.alloc_slot(payload)
    }

    /// Allocates a detached empty Array.
    pub fn alloc_array(&mut self) -> NodeId {
        self.alloc_slot(Payload::Array(Vec::new()))
    }

    /// Allocates a detached empty Object.
    pub fn alloc_object(&mut self) -> NodeId {
        self.alloc_slot(Payload::Object(Vec::new()))
    }

    // ---- node inspection ----

    pub fn kind(&self, id: NodeId) -> Kind {
        match &self.slots[id.0].payload {
            Payload::Null => Kind::Null,
            Payload::Bool(_) => Kind::Bool,
            Payload::Int(_) => Kind::Int,
            Payload::Float(_) => Kind::Float,
            Payload::Str(_) => Kind::Str,
            Payload::Array(_) => Kind::Array,
            Payload::Object(_) => Kind::Object,
        }
    }

    pub fn is_container(&self, id: NodeId) -> bool {
        matches!(self.kind(id), Kind::Array | Kind::Object)
    }

    /// The member key or positional index under the parent; empty while
    /// detached.
    pub fn name(&self, id: NodeId) -> &str {
        &self.slots[id.0].name
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.slots[id.0].parent
    }

    pub fn as_bool(&self, id: NodeId) -> Option<bool> {
        match self.slots[id.0].payload {
            Payload::Bool(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_int(&self, id: NodeId) -> Option<i64> {
        match self.slots[id.0].payload {
            Payload::Int(i) => Some(i),
            _ => None,
        }
    }

    pub fn as_float(&self, id: NodeId) -> Option<f64> {
        match self.slots[id.0].payload {
            Payload::Float(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_str(&self, id: NodeId) -> Option<&str> {
        match &self.slots[id.0].payload {
            Payload::Str(s) => Some(s),
            _ => None,
        }
    }

    // ---- children ----

    fn child_ids(&self, id: NodeId) -> &[NodeId] {
        match &self.slots[id.0].payload {
            Payload::Array(v) | Payload::Object(v) => v,
            _ => &[],
        }
    }

    fn kids_mut(&mut self, id: NodeId) -> Option<&mut Vec<NodeId>> {
        match &mut self.slots[id.0].payload {
            Payload::Array(v) | Payload::Object(v) => Some(v),
            _ => None,
        }
    }

    /// Number of children; 0 for scalars.
    pub fn len(&self, id: NodeId) -> usize {
        self.child_ids(id).len()
    }

    pub fn is_empty(&self, id: NodeId) -> bool {
        self.child_ids(id).is_empty()
    }

    pub fn children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.child_ids(id).iter().copied()
    }

    pub fn entries(&self, id: NodeId) -> impl Iterator<Item = (&str, NodeId)> + '_ {
        self.child_ids(id).iter().map(move |&c| (self.name(c), c))
    }

    /// Children that are scalars, skipping containers during iteration.
    pub fn scalars(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id).filter(move |&c| !self.is_container(c))
    }

    /// Children that are containers, skipping scalars during iteration.
    pub fn containers(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id).filter(move |&c| self.is_container(c))
    }

    /// Direct child lookup by name (linear scan, insertion order).
    pub fn child(&self, id: NodeId, name: &str) -> Option<NodeId> {
        self.child_ids(id).iter().copied().find(|&c| self.slots[c.0].name == name)
    }

    // ---- traversal ----

    pub(crate) fn walk(&self, from: NodeId, path: &str) -> Walk {
        let mut container = from;
        let mut offset = 0;
        loop {
            let rest = &path[offset..];
            let seg_len = rest.find('.').unwrap_or(rest.len());
            let seg = &rest[..seg_len];
            let hit = self.child(container, seg);
            if offset + seg_len == path.len() {
                return Walk { container, found: hit, matched: true, resume: offset };
            }
            match hit {
                Some(c) if self.is_container(c) => {
                    container = c;
                    offset += seg_len + 1;
                }
                _ => return Walk { container, found: hit, matched: false, resume: offset },
            }
        }
    }

    // ---- reads ----

    pub fn has(&self, from: NodeId, path: &str) -> bool {
        let w = self.walk(from, path);
        w.matched && w.found.is_some()
    }

    pub fn get(&self, from: NodeId, path: &str) -> Option<NodeId> {
        let w = self.walk(from, path);
        if w.matched { w.found } else { None }
    }

    pub fn get_bool(&self, from: NodeId, path: &str, default: bool) -> bool {
        self.get(from, path).and_then(|id| self.as_bool(id)).unwrap_or(default)
    }

    pub fn get_int(&self, from: NodeId, path: &str, default: i64) -> i64 {
        self.get(from, path).and_then(|id| self.as_int(id)).unwrap_or(default)
    }

    pub fn get_float(&self, from: NodeId, path: &str, default: f64) -> f64 {
        self.get(from, path).and_then(|id| self.as_float(id)).unwrap_or(default)
    }

    pub fn get_str<'a>(&'a self, from: NodeId, path: &str, default: &'a str) -> &'a str {
        match self.get(from, path) {
            Some(id) => self.as_str(id).unwrap_or(default),
            None => default,
        }
    }

    pub fn get_array(&self, from: NodeId, path: &str) -> Option<NodeId> {
        self.get(from, path).filter(|&id| self.kind(id) == Kind::Array)
    }

    pub fn get_object(&self, from: NodeId, path: &str) -> Option<NodeId> {
        self.get(from, path).filter(|&id| self.kind(id) == Kind::Object)
    }

    // ---- writes ----

    fn assign(&mut self, node: NodeId, parent: NodeId, name: String) {
        let slot = &mut self.slots[node.0];
        slot.parent = Some(parent);
        slot.name = name;
    }

    fn unassign(&mut self, node: NodeId) {
        let slot = &mut self.slots[node.0];
        slot.parent = None;
        slot.name.clear();
    }

    // Replace-or-append under a container. Objects replace an existing member
    // of the same name in place; Arrays replace a numeric in-range name in
    // place and append anything else at the current length.
    pub(crate) fn attach(&mut self, parent: NodeId, name: &str, node: NodeId) {
        let replace_at = match self.kind(parent) {
            Kind::Object => {
                self.child_ids(parent).iter().position(|&c| self.slots[c.0].name == name)
            }
            Kind::Array => name
                .parse::<usize>()
                .ok()
                .filter(|&i| i < self.len(parent) && name.bytes().all(|b| b.is_ascii_digit())),
            _ => return,
        };
        match replace_at {
            Some(pos) => {
                let old = self.child_ids(parent)[pos];
                if let Some(kids) = self.kids_mut(parent) {
                    kids[pos] = node;
                }
                let keep = std::mem::take(&mut self.slots[old.0].name);
                self.slots[old.0].parent = None;
                self.assign(node, parent, keep);
            }
            None => {
                if self.kind(parent) == Kind::Array {
                    self.append(parent, node);
                } else {
                    if let Some(kids) = self.kids_mut(parent) {
                        kids.push(node);
                    }
                    self.assign(node, parent, name.to_string());
                }
            }
        }
    }

    // Append at the tail of an Array, taking the length index as the name.
    pub(crate) fn append(&mut self, parent: NodeId, node: NodeId) {
        let idx = self.len(parent);
        let Some(kids) = self.kids_mut(parent) else { return };
        kids.push(node);
        self.assign(node, parent, idx.to_string());
    }

    // Creates whatever remains of the path chain and attaches the node at
    // its end. Missing intermediates become Arrays when the following
    // segment is all digits, Objects otherwise; a scalar squatting on a
    // segment name is replaced in place.
    fn place(&mut self, from: NodeId, path: &str, node: NodeId) -> NodeId {
        let w = self.walk(from, path);
        let mut cur = w.container;
        let mut offset = w.resume;
        loop {
            let rest = &path[offset..];
            let Some(dot) = rest.find('.') else {
                self.attach(cur, rest, node);
                return node;
            };
            let seg = &rest[..dot];
            let next = &rest[dot + 1..];
            let next_seg = &next[..next.find('.').unwrap_or(next.len())];
            match self.child(cur, seg) {
                Some(c) if self.is_container(c) => cur = c,
                _ => {
                    let numeric = !next_seg.is_empty()
                        && next_seg.bytes().all(|b| b.is_ascii_digit());
                    let fresh = if numeric { self.alloc_array() } else { self.alloc_object() };
                    self.attach(cur, seg, fresh);
                    cur = fresh;
                }
            }
            offset += dot + 1;
        }
    }

    /// Sets a scalar at a dotted path, replacing an existing node in place
    /// (its name, and so its array index, is preserved) or creating the
    /// missing chain of intermediate containers.
    pub fn set(&mut self, from: NodeId, path: &str, value: impl Into<Scalar>) -> NodeId {
        let node = self.alloc(value);
        self.place(from, path, node)
    }

    /// [`Document::set`] for an already-allocated detached node.
    pub fn set_node(&mut self, from: NodeId, path: &str, node: NodeId) -> Result<NodeId, DocError> {
        if self.slots[node.0].parent.is_some() {
            return Err(DocError::NodeAssigned);
        }
        Ok(self.place(from, path, node))
    }

    /// Appends a scalar to an Array.
    pub fn push(&mut self, array: NodeId, value: impl Into<Scalar>) -> Result<NodeId, DocError> {
        if self.kind(array) != Kind::Array {
            return Err(DocError::NotAContainer);
        }
        let node = self.alloc(value);
        self.append(array, node);
        Ok(node)
    }

    /// Appends an already-allocated detached node to an Array.
    pub fn push_node(&mut self, array: NodeId, node: NodeId) -> Result<NodeId, DocError> {
        if self.kind(array) != Kind::Array {
            return Err(DocError::NotAContainer);
        }
        if self.slots[node.0].parent.is_some() {
            return Err(DocError::NodeAssigned);
        }
        self.append(array, node);
        Ok(node)
    }

    /// Inserts a scalar member into an Object, replacing any member of the
    /// same name in place.
    pub fn insert(
        &mut self,
        object: NodeId,
        name: &str,
        value: impl Into<Scalar>,
    ) -> Result<NodeId, DocError> {
        if self.kind(object) != Kind::Object {
            return Err(DocError::NotAContainer);
        }
        let node = self.alloc(value);
        self.attach(object, name, node);
        Ok(node)
    }

    /// [`Document::insert`] for an already-allocated detached node.
    pub fn insert_node(
        &mut self,
        object: NodeId,
        name: &str,
        node: NodeId,
    ) -> Result<NodeId, DocError> {
        if self.kind(object) != Kind::Object {
            return Err(DocError::NotAContainer);
        }
        if self.slots[node.0].parent.is_some() {
            return Err(DocError::NodeAssigned);
        }
        self.attach(object, name, node);
        Ok(node)
    }

    // ---- removal ----

    /// Detaches the node at a dotted path and returns it, or None if the
    /// path does not resolve. A non-tail Array removal reindexes the
    /// following siblings to restore contiguous names.
    pub fn remove(&mut self, from: NodeId, path: &str) -> Option<NodeId> {
        let w = self.walk(from, path);
        let target = if w.matched { w.found? } else { return None };
        self.detach(target);
        Some(target)
    }

    /// Detaches a node from its parent; no-op for detached nodes.
    pub fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.slots[id.0].parent else { return };
        if let Some(kids) = self.kids_mut(parent)
            && let Some(pos) = kids.iter().position(|&c| c == id)
        {
            kids.remove(pos);
        }
        self.unassign(id);
        if self.kind(parent) == Kind::Array {
            self.reindex(parent);
        }
    }

    // Scan forward from the first position whose name no longer equals its
    // index and relabel the rest; a tail removal finds nothing to do.
    fn reindex(&mut self, array: NodeId) {
        let ids: Vec<NodeId> = self.child_ids(array).to_vec();
        for (i, c) in ids.into_iter().enumerate() {
            let want = i.to_string();
            let slot = &mut self.slots[c.0];
            if slot.name != want {
                slot.name = want;
            }
        }
    }

    // ---- copying ----

    /// Detached deep copy of a subtree, ready for reinsertion elsewhere in
    /// this document. Relocation is duplicate + remove + insert; the source
    /// container is never aliased.
    pub fn duplicate(&mut self, id: NodeId) -> NodeId {
        let copy = self.copy_rec(id);
        self.slots[copy.0].name.clear();
        copy
    }

    fn copy_rec(&mut self, id: NodeId) -> NodeId {
        match &self.slots[id.0].payload {
            Payload::Array(v) | Payload::Object(v) => {
                let src = v.clone();
                let container = match self.kind(id) {
                    Kind::Array => self.alloc_array(),
                    _ => self.alloc_object(),
                };
                for k in src {
                    let name = self.slots[k.0].name.clone();
                    let ck = self.copy_rec(k);
                    if let Some(kids) = self.kids_mut(container) {
                        kids.push(ck);
                    }
                    self.assign(ck, container, name);
                }
                container
            }
            p => {
                let p = p.clone();
                self.alloc_slot(p)
            }
        }
    }

    /// Deep-copies a subtree from another document into this one, returning
    /// a detached node.
    pub fn adopt(&mut self, other: &Document, id: NodeId) -> NodeId {
        match &other.slots[id.0].payload {
            Payload::Array(v) | Payload::Object(v) => {
                let container = match other.kind(id) {
                    Kind::Array => self.alloc_array(),
                    _ => self.alloc_object(),
                };
                for &k in v {
                    let name = other.slots[k.0].name.clone();
                    let ck = self.adopt(other, k);
                    if let Some(kids) = self.kids_mut(container) {
                        kids.push(ck);
                    }
                    self.assign(ck, container, name);
                }
                container
            }
            p => self.alloc_slot(p.clone()),
        }
    }

    // ---- comparison ----

    /// Structural equality: same name, same variant, same scalar value, and
    /// pairwise-equal children in order.
    pub fn node_eq(&self, a: NodeId, other: &Document, b: NodeId) -> bool {
        if self.slots[a.0].name != other.slots[b.0].name {
            return false;
        }
        match (&self.slots[a.0].payload, &other.slots[b.0].payload) {
            (Payload::Null, Payload::Null) => true,
            (Payload::Bool(x), Payload::Bool(y)) => x == y,
            (Payload::Int(x), Payload::Int(y)) => x == y,
            (Payload::Float(x), Payload::Float(y)) => x == y,
            (Payload::Str(x), Payload::Str(y)) => x == y,
            (Payload::Array(x), Payload::Array(y)) | (Payload::Object(x), Payload::Object(y)) => {
                x.len() == y.len()
                    && x.iter().zip(y).all(|(&ca, &cb)| self.node_eq(ca, other, cb))
            }
            _ => false,
        }
    }
}
