//! Test support: assembling syntactically valid Java class files
//!
//! Used by unit and integration tests across the workspace to put plugin
//! definition and delegate classes into fixture archives without a Java
//! toolchain. Not part of the lint pipeline.

/// Builder for a minimal, well-formed class file
pub struct ClassFileBuilder {
    class_name: String,
    super_class: String,
    interfaces: Vec<String>,
    methods: Vec<String>,
    strings: Vec<String>,
}

impl ClassFileBuilder {
    pub fn new(class_name: &str) -> Self {
        Self {
            class_name: class_name.replace('.', "/"),
            super_class: "java/lang/Object".to_string(),
            interfaces: Vec::new(),
            methods: Vec::new(),
            strings: Vec::new(),
        }
    }

    pub fn super_class(mut self, name: &str) -> Self {
        self.super_class = name.replace('.', "/");
        self
    }

    pub fn interface(mut self, name: &str) -> Self {
        self.interfaces.push(name.replace('.', "/"));
        self
    }

    pub fn method(mut self, name: &str) -> Self {
        self.methods.push(name.to_string());
        self
    }

    pub fn string_constant(mut self, value: &str) -> Self {
        self.strings.push(value.to_string());
        self
    }

    /// The conventional methods of a process plugin definition
    pub fn plugin_definition_methods(self) -> Self {
        self.method("getName")
            .method("getProcessModels")
            .method("getFhirResourcesByProcessId")
    }

    pub fn build(self) -> Vec<u8> {
        let mut pool: Vec<Vec<u8>> = Vec::new();
        let push_utf8 = |pool: &mut Vec<Vec<u8>>, s: &str| -> u16 {
            let mut entry = vec![1u8];
            entry.extend((s.len() as u16).to_be_bytes());
            entry.extend(s.as_bytes());
            pool.push(entry);
            pool.len() as u16
        };
        let push_class = |pool: &mut Vec<Vec<u8>>, name_index: u16| -> u16 {
            let mut entry = vec![7u8];
            entry.extend(name_index.to_be_bytes());
            pool.push(entry);
            pool.len() as u16
        };

        let this_utf8 = push_utf8(&mut pool, &self.class_name);
        let this_class = push_class(&mut pool, this_utf8);
        let super_utf8 = push_utf8(&mut pool, &self.super_class);
        let super_class = push_class(&mut pool, super_utf8);
        let interface_indices: Vec<u16> = self
            .interfaces
            .iter()
            .map(|name| {
                let utf8 = push_utf8(&mut pool, name);
                push_class(&mut pool, utf8)
            })
            .collect();
        let descriptor = push_utf8(&mut pool, "()V");
        let method_names: Vec<u16> = self
            .methods
            .iter()
            .map(|name| push_utf8(&mut pool, name))
            .collect();
        for s in &self.strings {
            let utf8 = push_utf8(&mut pool, s);
            let mut entry = vec![8u8];
            entry.extend(utf8.to_be_bytes());
            pool.push(entry);
        }

        let mut out = Vec::new();
        out.extend(0xCAFE_BABEu32.to_be_bytes());
        out.extend(0u16.to_be_bytes()); // minor
        out.extend(61u16.to_be_bytes()); // major (Java 17)
        out.extend(((pool.len() + 1) as u16).to_be_bytes());
        for entry in &pool {
            out.extend(entry);
        }
        out.extend(0x0021u16.to_be_bytes()); // ACC_PUBLIC | ACC_SUPER
        out.extend(this_class.to_be_bytes());
        out.extend(super_class.to_be_bytes());
        out.extend((interface_indices.len() as u16).to_be_bytes());
        for index in &interface_indices {
            out.extend(index.to_be_bytes());
        }
        out.extend(0u16.to_be_bytes()); // fields
        out.extend((method_names.len() as u16).to_be_bytes());
        for name_index in &method_names {
            out.extend(0x0001u16.to_be_bytes()); // ACC_PUBLIC
            out.extend(name_index.to_be_bytes());
            out.extend(descriptor.to_be_bytes());
            out.extend(0u16.to_be_bytes()); // attributes
        }
        out.extend(0u16.to_be_bytes()); // class attributes
        out
    }
}
