use std::ops::Deref;

use gc::{Finalize, Gc, GcCell, Trace};
use rustc_hash::FxHashMap;

use crate::object::Object;

/// A scope frame. Cloning an [`Env`] clones the handle, not the frame, so
/// every holder sees assignments made through any other.
#[derive(Clone, Debug, Finalize, Trace)]
pub struct Env(Gc<GcCell<EnvImpl>>);

impl Default for Env {
    fn default() -> Self {
        Self(Gc::new(GcCell::new(EnvImpl::default())))
    }
}

impl Deref for Env {
    type Target = Gc<GcCell<EnvImpl>>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Env {
    pub fn with_parent(parent: &Env) -> Self {
        let env = EnvImpl { map: FxHashMap::default(), parent: Some(parent.clone()) };
        Self(Gc::new(GcCell::new(env)))
    }

    /// Binds a new name in this frame. Fails if the frame already has it.
    pub fn define(&self, name: &str, value: Object) -> Result<(), ()> {
        let mut env = self.borrow_mut();
        if env.map.contains_key(name) {
            return Err(());
        }
        env.map.insert(name.to_string(), value);
        Ok(())
    }

    pub fn insert_unchecked(&self, name: &str, value: Object) {
        self.borrow_mut().map.insert(name.to_string(), value);
    }

    pub fn get(&self, name: &str) -> Option<Object> {
        self.borrow().map.get(name).cloned()
    }

    /// Reads `name` from the frame `depth` levels out from this one.
    pub fn get_at(&self, name: &str, depth: usize) -> Option<Object> {
        self.ancestor(depth)?.get(name)
    }

    pub fn set(&self, name: &str, value: Object) -> Result<(), ()> {
        match self.borrow_mut().map.get_mut(name) {
            Some(entry) => {
                *entry = value;
                Ok(())
            }
            None => Err(()),
        }
    }

    /// Rebinds `name` in the frame `depth` levels out from this one.
    pub fn set_at(&self, name: &str, value: Object, depth: usize) -> Result<(), ()> {
        self.ancestor(depth).ok_or(())?.set(name, value)
    }

    pub fn names(&self) -> Vec<String> {
        self.borrow().map.keys().cloned().collect()
    }

    fn ancestor(&self, depth: usize) -> Option<Env> {
        let mut env = self.clone();
        for _ in 0..depth {
            let parent = env.borrow().parent.clone()?;
            env = parent;
        }
        Some(env)
    }
}

#[derive(Debug, Default, Finalize, Trace)]
pub struct EnvImpl {
    map: FxHashMap<String, Object>,
    parent: Option<Env>,
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    #[test]
    fn define_rejects_duplicates() {
        let env = Env::default();
        assert_eq!(env.define("x", Object::Number(1.0)), Ok(()));
        assert_eq!(env.define("x", Object::Number(2.0)), Err(()));
        assert_eq!(env.get("x"), Some(Object::Number(1.0)));
    }

    #[test]
    fn lookup_by_depth() {
        let globals = Env::default();
        globals.insert_unchecked("x", Object::Text("outer".to_string()));
        let block = Env::with_parent(&globals);
        block.insert_unchecked("x", Object::Text("inner".to_string()));
        let inner = Env::with_parent(&block);

        assert_eq!(inner.get_at("x", 1), Some(Object::Text("inner".to_string())));
        assert_eq!(inner.get_at("x", 2), Some(Object::Text("outer".to_string())));
        assert_eq!(inner.get_at("x", 0), None);
        assert_eq!(inner.get_at("x", 3), None);
    }

    #[test]
    fn assignment_is_shared_between_handles() {
        let globals = Env::default();
        globals.insert_unchecked("count", Object::Number(0.0));
        let first = Env::with_parent(&globals);
        let second = Env::with_parent(&globals);

        assert_eq!(first.set_at("count", Object::Number(5.0), 1), Ok(()));
        assert_eq!(second.get_at("count", 1), Some(Object::Number(5.0)));
        assert_eq!(second.set_at("missing", Object::Empty, 1), Err(()));
        assert_eq!(second.get("count"), None);
    }
}
