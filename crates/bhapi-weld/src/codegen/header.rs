//! C API header generator
//!
//! Renders the single header shared by the provider module and its
//! consumers. The header carries the inlined type definitions, per-function
//! index/return/parameter macros and a total-count macro, followed by two
//! mutually exclusive sections selected by the module flag:
//!
//! - provider build: static prototypes and the table initializer
//! - consumer build: call-through macros, the shared table variable and the
//!   import routine performing the name-keyed lookup

use crate::ir::{ApiModule, IndexedFunction};

/// Lookup function declared by `Python.h`; any other lookup gets a prototype
const PYTHON_CAPSULE_LOOKUP: &str = "PyCapsule_Import";

const BANNER: &str = "/* This file is auto generated by bhapi-weld - do not edit manually */\n";

/// Generator for the C API header
pub struct HeaderGenerator<'a> {
    module: &'a ApiModule,
}

impl<'a> HeaderGenerator<'a> {
    /// Create a new header generator
    pub fn new(module: &'a ApiModule) -> Self {
        Self { module }
    }

    /// Generate the complete header around the given type definitions
    pub fn generate(&self, type_definitions: &str) -> String {
        let names = &self.module.names;
        let mut output = String::new();

        output.push_str(&format!("#ifndef {0}\n#define {0}\n\n", names.guard));
        output.push_str(&self.generate_banner());
        output.push('\n');
        output.push_str(type_definitions.trim_end());
        output.push_str("\n\n");

        output.push_str("#ifdef __cplusplus\nextern \"C\" {\n#endif\n\n");

        output.push_str("/* C API functions */\n");
        output.push_str(&self.generate_function_macros());
        output.push('\n');

        output.push_str("/* Total number of C API pointers */\n");
        output.push_str(&format!(
            "#define {} {}\n\n",
            names.count_macro(),
            self.module.table_len()
        ));

        output.push_str(&format!("#ifdef {}\n", names.module_flag));
        output.push_str("/* This section is used when compiling the provider module */\n\n");
        output.push_str(&self.generate_prototypes());
        output.push('\n');
        output.push_str(&self.generate_initializer());
        output.push_str("\n#else\n");
        output.push_str("/* This section is used in modules that use the provider's API */\n\n");
        output.push_str(&self.generate_call_macros());
        output.push('\n');
        output.push_str(&self.generate_import());
        output.push_str("#endif\n\n");

        output.push_str("#ifdef __cplusplus\n}\n#endif\n");
        output.push_str(&format!("#endif /* !defined({}) */\n", names.guard));
        output
    }

    fn generate_banner(&self) -> String {
        let mut output = String::from(BANNER);
        if let Some(ref doc) = self.module.doc {
            output.push_str("/*\n");
            for line in doc.lines() {
                if line.trim().is_empty() {
                    output.push_str(" *\n");
                } else {
                    output.push_str(&format!(" * {}\n", line));
                }
            }
            output.push_str(" */\n");
        }
        output
    }

    /// `_NUM`, `_RETURN` and `_PROTO` macros for every function
    pub fn generate_function_macros(&self) -> String {
        let prefix = &self.module.names.prefix;
        let mut output = String::new();
        for f in &self.module.functions {
            output.push_str(&format!("#define {} {}\n", f.index_macro(prefix), f.index));
            output.push_str(&format!(
                "#define {} {}\n",
                f.return_macro(prefix),
                f.signature.return_type
            ));
            output.push_str(&format!(
                "#define {} {}\n",
                f.proto_macro(prefix),
                f.signature.parameter_list
            ));
        }
        output
    }

    /// Forward declarations composed from the per-function macros
    fn generate_prototypes(&self) -> String {
        let prefix = &self.module.names.prefix;
        self.module
            .functions
            .iter()
            .map(|f| {
                format!(
                    "static {} {} {};\n",
                    f.return_macro(prefix),
                    f.signature.symbol(prefix),
                    f.proto_macro(prefix)
                )
            })
            .collect()
    }

    /// Initializer writing every function address at its index
    ///
    /// The caller guarantees the array holds at least the total-count slots.
    fn generate_initializer(&self) -> String {
        let names = &self.module.names;
        let mut output = format!(
            "static void {}(void *c_api_struct[]) {{\n",
            names.init_function
        );
        for f in &self.module.functions {
            output.push_str(&self.assignment(f));
        }
        output.push_str("}\n");
        output
    }

    fn assignment(&self, f: &IndexedFunction) -> String {
        let prefix = &self.module.names.prefix;
        format!(
            "    c_api_struct[{}] = (void *){};\n",
            f.index_macro(prefix),
            f.signature.symbol(prefix)
        )
    }

    /// Call-through macros dereferencing the shared table
    fn generate_call_macros(&self) -> String {
        let names = &self.module.names;
        self.module
            .functions
            .iter()
            .map(|f| {
                format!(
                    "#define {sym} (*({ret} (*){proto}) {table}[{num}])\n",
                    sym = f.signature.symbol(&names.prefix),
                    ret = f.return_macro(&names.prefix),
                    proto = f.proto_macro(&names.prefix),
                    table = names.table_name,
                    num = f.index_macro(&names.prefix),
                )
            })
            .collect()
    }

    /// Shared table declaration and the idempotent import routine
    fn generate_import(&self) -> String {
        let names = &self.module.names;
        let lookup_prototype = if names.lookup_function == PYTHON_CAPSULE_LOOKUP {
            String::new()
        } else {
            format!(
                "    void *{}(const char *name, int no_block);\n",
                names.lookup_function
            )
        };
        format!(
            r#"#ifdef {no_import}
    extern void **{table};
#else
{lookup_prototype}    void **{table};
    /* Return -1 on error, 0 on success.
     * Repeated calls after a successful import are no-ops.
     * {lookup} sets an exception if there's an error.
     */
    static int
    {import}(void)
    {{
        if ({table} != NULL) {{
            return 0;
        }}
        {table} = (void **){lookup}("{key}", 0);
        return ({table} != NULL) ? 0 : -1;
    }}
#endif
"#,
            no_import = names.no_import_flag,
            table = names.table_name,
            import = names.import_function,
            lookup = names.lookup_function,
            key = names.capsule_key,
        )
    }
}
