use crate::runtime_field_info::RuntimeFieldInfo;
use indexmap::IndexMap;

/// 字段在布局表里的键：名字+描述符
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldKey {
    pub name: String,
    pub desc: String,
}

impl FieldKey {
    pub fn new(name: &str, desc: &str) -> FieldKey {
        FieldKey {
            name: name.to_string(),
            desc: desc.to_string(),
        }
    }
}

/// 描述符对应的存储宽度(字节)
pub fn field_size(descriptor: &str) -> usize {
    match descriptor.as_bytes().first() {
        Some(b'J') | Some(b'D') => 8,
        Some(b'I') | Some(b'F') => 4,
        Some(b'C') | Some(b'S') => 2,
        Some(b'B') | Some(b'Z') => 1,
        // 引用按指针宽度存
        _ => 8,
    }
}

const fn align_to(offset: usize, align: usize) -> usize {
    match offset % align {
        0 => offset,
        n => offset + (align - n),
    }
}

/// (name, desc) -> 字节偏移。
/// 虚表布局：先继承父类布局(同偏移)，再排本类实例字段，保证子类对象
/// 能用父类的偏移直接访问继承字段。静态布局只含本类声明的静态字段。
#[derive(Debug, Default)]
pub struct FieldLayout {
    offsets: IndexMap<FieldKey, usize>,
    size: usize,
}

impl FieldLayout {
    pub fn empty() -> FieldLayout {
        FieldLayout::default()
    }

    pub fn build_virtual(
        super_layout: Option<&FieldLayout>,
        fields: &[RuntimeFieldInfo],
    ) -> FieldLayout {
        let mut layout = match super_layout {
            Some(parent) => FieldLayout {
                offsets: parent.offsets.clone(),
                size: parent.size,
            },
            None => FieldLayout::empty(),
        };
        for field in fields.iter().filter(|f| !f.is_static()) {
            layout.append(&field.name, &field.descriptor);
        }
        layout
    }

    pub fn build_static(fields: &[RuntimeFieldInfo]) -> FieldLayout {
        let mut layout = FieldLayout::empty();
        for field in fields.iter().filter(|f| f.is_static()) {
            layout.append(&field.name, &field.descriptor);
        }
        layout
    }

    fn append(&mut self, name: &str, desc: &str) {
        let width = field_size(desc);
        let offset = align_to(self.size, width);
        self.offsets.insert(FieldKey::new(name, desc), offset);
        self.size = offset + width;
    }

    pub fn offset_of(&self, name: &str, desc: &str) -> Option<usize> {
        self.offsets.get(&FieldKey::new(name, desc)).copied()
    }

    pub fn find_by_name(&self, name: &str) -> Option<(&FieldKey, usize)> {
        self.offsets
            .iter()
            .find(|(key, _)| key.name == name)
            .map(|(key, offset)| (key, *offset))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FieldKey, usize)> {
        self.offsets.iter().map(|(key, offset)| (key, *offset))
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// 数据区总字节数
    pub fn size(&self) -> usize {
        self.size
    }
}
