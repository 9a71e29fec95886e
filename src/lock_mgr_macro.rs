#[macro_export]
macro_rules! declare_locks_table {
    ($struct_name:ident; $field_name:ty) => {
        #[derive(Debug, Clone)]
        /// Table_key is either a ResourceId or the owning transaction name.
        pub(crate) struct $struct_name {
            table_key: $field_name,
            locks: std::sync::Arc<parking_lot::RwLock<Vec<Lock>>>,
        }

        #[allow(dead_code)]
        impl $struct_name {
            pub fn new(input_arg: $field_name) -> Self {
                Self {
                    table_key: input_arg,
                    locks: std::sync::Arc::new(parking_lot::RwLock::new(vec![])),
                }
            }

            pub fn table_key(&self) -> &$field_name {
                &self.table_key
            }

            /// First lock held by someone other than `txn` that blocks `require_lock`.
            pub fn conflicting_lock(&self, txn: &str, require_lock: LockMode) -> Option<Lock> {
                let locks_vec = &*self.locks.read();
                locks_vec
                    .iter()
                    .find(|lock| lock.txn != txn && !lock.lock_mode.compatible(require_lock))
                    .cloned()
            }

            pub fn lock_size(&self) -> usize {
                let lock_guard = &*self.locks.read();
                lock_guard.len()
            }

            pub fn locks(&self) -> Vec<Lock> {
                self.locks.read().clone()
            }

            pub fn remove_locks_of(&self, txn: &str) {
                let mut lock_vec = self.locks.write();
                let vec_lock = &mut *lock_vec;
                vec_lock.retain(|lock| lock.txn != txn);
            }

            pub fn update_lock(&self, new_lock: Lock) {
                let locks_vec = &mut *self.locks.write();
                if let Some(ele) = locks_vec
                    .iter_mut()
                    .find(|ele| ele.rid == new_lock.rid && ele.txn == new_lock.txn)
                {
                    *ele = new_lock;
                }
            }

            pub fn add_lock(&self, new_lock: Lock) {
                let locks_vec = &mut *self.locks.write();
                locks_vec.push(new_lock);
            }

            pub fn get_lock_mode(&self, txn: &str, input_rid: &str) -> LockMode {
                let locks_vec = &*self.locks.read();
                for lock in locks_vec.iter() {
                    if lock.rid == input_rid && lock.txn == txn {
                        return lock.lock_mode;
                    }
                }
                LockMode::NoLock
            }
        }
    };
}
