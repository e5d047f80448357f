use crate::loaded_class::ClassRef;
use parking_lot::Mutex;
use std::collections::HashMap;

/// 每个类加载器一份：该loader定义的类(name -> class)。
/// 定义事务(查重+链接)必须整体持有本锁，见defineClass的契约。
pub struct ClassLoaderData<'a> {
    classes: Mutex<HashMap<String, ClassRef<'a>>>,
}

impl<'a> Default for ClassLoaderData<'a> {
    fn default() -> Self {
        ClassLoaderData::new()
    }
}

impl<'a> ClassLoaderData<'a> {
    pub fn new() -> ClassLoaderData<'a> {
        ClassLoaderData {
            classes: Mutex::new(HashMap::new()),
        }
    }

    pub fn find(&self, name: &str) -> Option<ClassRef<'a>> {
        self.classes.lock().get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.classes.lock().contains_key(name)
    }

    /// 在锁内执行定义事务。f返回Err则什么都不写。
    pub fn define_with<T, E>(
        &self,
        f: impl FnOnce(&mut HashMap<String, ClassRef<'a>>) -> Result<T, E>,
    ) -> Result<T, E> {
        let mut classes = self.classes.lock();
        f(&mut classes)
    }

    pub fn link(&self, class: ClassRef<'a>) {
        self.classes.lock().insert(class.name.clone(), class);
    }

    pub fn len(&self) -> usize {
        self.classes.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.lock().is_empty()
    }

    pub fn snapshot(&self) -> Vec<ClassRef<'a>> {
        self.classes.lock().values().copied().collect()
    }
}
