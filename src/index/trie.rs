use std::{any::Any, collections::HashMap, sync::Arc};

// Values are type-erased; `get` recovers the static type with a runtime
// downcast and misses on a mismatch.
type TrieValue = Arc<dyn Any + Send + Sync>;

/// Immutable trie node. Never mutated after publication; versions of the
/// trie share whole subtrees through the `Arc`s in `children`.
pub struct TrieNode {
    children: HashMap<u8, Arc<TrieNode>>,
    value: Option<TrieValue>,
}

impl TrieNode {
    fn empty() -> Self {
        TrieNode {
            children: HashMap::new(),
            value: None,
        }
    }

    fn with_children(children: HashMap<u8, Arc<TrieNode>>) -> Self {
        TrieNode {
            children,
            value: None,
        }
    }

    // Shallow copy: the children map is cloned, the subtrees are shared.
    fn shallow_clone(&self) -> Self {
        TrieNode {
            children: self.children.clone(),
            value: self.value.clone(),
        }
    }

    pub fn child(&self, byte: u8) -> Option<&Arc<TrieNode>> {
        self.children.get(&byte)
    }

    pub fn is_value_node(&self) -> bool {
        self.value.is_some()
    }
}

/// Copy-on-write map over byte-sequence keys. `put` and `remove` build a
/// new trie that shares every untouched subtree with the old one, so a
/// handle is cheap to clone and safe to read from any thread.
#[derive(Clone, Default)]
pub struct Trie {
    root: Option<Arc<TrieNode>>,
}

impl Trie {
    pub fn new() -> Self {
        Trie { root: None }
    }

    pub fn root(&self) -> Option<&Arc<TrieNode>> {
        self.root.as_ref()
    }

    /// Walks the key and returns the stored value if the terminal node
    /// holds one of type `T`.
    pub fn get<T: Any + Send + Sync>(&self, key: &[u8]) -> Option<&T> {
        let mut node = self.root.as_ref()?;
        for byte in key {
            node = node.children.get(byte)?;
        }
        node.value.as_ref()?.downcast_ref::<T>()
    }

    /// Returns a new trie with `value` stored at `key`. The empty key
    /// stores on the root.
    pub fn put<T: Any + Send + Sync>(&self, key: &[u8], value: T) -> Trie {
        let value: TrieValue = Arc::new(value);
        let new_root = put_node(self.root.as_deref(), key, value);

        Trie {
            root: Some(Arc::new(new_root)),
        }
    }

    /// Returns a new trie without `key`. Removing an absent key hands back
    /// a trie sharing this one's root.
    pub fn remove(&self, key: &[u8]) -> Trie {
        let Some(root) = self.root.as_ref() else {
            return self.clone();
        };

        match remove_node(root, key) {
            None => self.clone(),
            Some(new_root) => Trie { root: new_root },
        }
    }
}

// Builds the replacement node for this position. Only nodes along the key
// path are rebuilt; everything else is shared from `node`.
fn put_node(node: Option<&TrieNode>, key: &[u8], value: TrieValue) -> TrieNode {
    let mut new_node = match node {
        Some(node) => node.shallow_clone(),
        None => TrieNode::empty(),
    };

    match key.split_first() {
        None => {
            // Terminal position: become a value node, keeping any children.
            new_node.value = Some(value);
        }
        Some((&byte, rest)) => {
            let old_child = node.and_then(|n| n.children.get(&byte)).map(Arc::as_ref);
            let new_child = put_node(old_child, rest, value);
            new_node.children.insert(byte, Arc::new(new_child));
        }
    }

    new_node
}

// `None` means the key is not present and the whole remove is a no-op.
// `Some(None)` means this node ends up with no children and no value and
// is dropped from its parent; `Some(Some(n))` is the rebuilt node.
fn remove_node(node: &Arc<TrieNode>, key: &[u8]) -> Option<Option<Arc<TrieNode>>> {
    match key.split_first() {
        None => {
            node.value.as_ref()?;

            if node.children.is_empty() {
                Some(None)
            } else {
                Some(Some(Arc::new(TrieNode::with_children(
                    node.children.clone(),
                ))))
            }
        }
        Some((&byte, rest)) => {
            let child = node.children.get(&byte)?;
            let new_child = remove_node(child, rest)?;

            let mut new_node = node.shallow_clone();
            match new_child {
                Some(child) => {
                    new_node.children.insert(byte, child);
                }
                None => {
                    new_node.children.remove(&byte);
                }
            }

            if new_node.children.is_empty() && new_node.value.is_none() {
                Some(None)
            } else {
                Some(Some(Arc::new(new_node)))
            }
        }
    }
}
