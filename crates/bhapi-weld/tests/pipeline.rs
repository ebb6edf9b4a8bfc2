use bhapi_weld::build::{ApiBuilder, ApiBuilderError};
use bhapi_weld::codegen::InfoFormat;
use bhapi_weld::ir::ApiNames;
use pretty_assertions::assert_eq;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

const PROVIDER: &str = r#"
#include <Python.h>
#include <bhc.h>

static int helper(int x) { return x + 1; }

/* Flush the pending instructions */
static void BhAPI_flush(void) {
    bhc_flush();
}

static void *BhAPI_data_get(bhc_dtype dtype,
                            const void *ary,
                            bool copy2host) {
    return bhc_data_get(dtype, ary, copy2host, false);
}

static const char *BhAPI_message(const char *msg) {
    return bhc_message(msg);
}

static int64_t BhAPI_random123(uint64_t seed, uint64_t key) { return 0; }
"#;

const TYPES_H: &str = "typedef enum { BH_BOOL, BH_INT32 } bhc_dtype;\n";

const OPCODES: &str = r#"[
    {"opcode": "BH_ADD", "id": 5, "nop": 3, "elementwise": true, "system_opcode": false,
     "types": [["BH_BOOL", "BH_BOOL", "BH_BOOL"], ["BH_INT32", "BH_INT32", "BH_INT32"],
               ["BH_R123", "BH_UINT64", "BH_UINT64"]]},
    {"opcode": "BH_FREE", "id": "1", "nop": 1, "elementwise": false, "system_opcode": true},
    {"opcode": "BH_IDENTITY", "id": 0, "nop": 2, "elementwise": 1, "system_opcode": false,
     "types": [["BH_INT32", "BH_BOOL"]]}
]"#;

const TYPES_JSON: &str = r#"[
    {"enum": "BH_BOOL", "numpy": "bool"},
    {"enum": "BH_INT32", "numpy": "int32"},
    {"enum": "BH_R123", "numpy": "unknown"}
]"#;

fn write_inputs(dir: &Path) {
    fs::write(dir.join("_bh_api.c"), PROVIDER).unwrap();
    fs::write(dir.join("bhc_types.h"), TYPES_H).unwrap();
    fs::write(dir.join("opcodes.json"), OPCODES).unwrap();
    fs::write(dir.join("types.json"), TYPES_JSON).unwrap();
}

fn builder(dir: &Path) -> ApiBuilder {
    ApiBuilder::new()
        .provider_source(dir.join("_bh_api.c"))
        .type_definitions(dir.join("bhc_types.h"))
        .metadata_tables(dir.join("opcodes.json"), dir.join("types.json"))
        .version("1.2.3-47")
        .out_dir(dir.join("out"))
}

/// Read back `#define <name> <value>` lines from a generated header
fn defines(header: &str) -> HashMap<String, String> {
    header
        .lines()
        .filter_map(|line| line.strip_prefix("#define "))
        .filter_map(|rest| {
            let (name, value) = rest.split_once(' ')?;
            Some((name.to_string(), value.to_string()))
        })
        .collect()
}

#[test]
fn test_full_pipeline_writes_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    write_inputs(dir.path());

    let output = builder(dir.path()).build().unwrap();

    assert_eq!(output.header_path, dir.path().join("out/bohrium_api.h"));
    assert_eq!(output.info_path, Some(dir.path().join("out/_info.json")));

    let header = fs::read_to_string(&output.header_path).unwrap();
    assert!(header.starts_with("#ifndef BH_API_H\n#define BH_API_H\n"));
    assert!(header.contains(TYPES_H.trim_end()));
    assert!(header.contains("#define BhAPI_num_of_pointers 4\n"));
    assert!(header.contains("    static int\n    import_bh_api(void)\n"));
    assert!(header.contains("PyCapsule_Import(\"bohrium_api._C_API\", 0)"));
    assert!(!header.contains("helper"));

    let info: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(output.info_path.unwrap()).unwrap()).unwrap();
    assert_eq!(info["version"], "1.2.3-47");
    assert_eq!(info["types"], serde_json::json!(["bool", "int32"]));
    assert_eq!(
        info["op"]["add"],
        serde_json::json!({
            "name": "add",
            "id": 5,
            "nop": 3,
            "elementwise": true,
            "type_sig": [["bool", "bool", "bool"], ["int32", "int32", "int32"]]
        })
    );
    assert_eq!(info["op"]["identity"]["type_sig"], serde_json::json!([["int32", "bool"]]));
    assert!(info["op"].get("free").is_none());
}

#[test]
fn test_header_macros_match_extracted_signatures() {
    let dir = tempfile::tempdir().unwrap();
    write_inputs(dir.path());

    let builder = builder(dir.path());
    let module = builder.api_module().unwrap();
    let header = builder.generate_header().unwrap();
    let defs = defines(&header);

    assert_eq!(
        module.function_names(),
        vec!["flush", "data_get", "message", "random123"]
    );
    for f in &module.functions {
        let sym = f.signature.symbol("BhAPI");
        assert_eq!(defs[&format!("{}_NUM", sym)], f.index.to_string());
        assert_eq!(defs[&format!("{}_RETURN", sym)], f.signature.return_type);
        assert_eq!(defs[&format!("{}_PROTO", sym)], f.signature.parameter_list);
        assert!(header.contains(&format!(
            "    c_api_struct[{0}_NUM] = (void *){0};\n",
            sym
        )));
        assert!(header.contains(&format!(
            "#define {0} (*({0}_RETURN (*){0}_PROTO) PyBhAPI[{0}_NUM])\n",
            sym
        )));
    }

    assert_eq!(defs["BhAPI_data_get_RETURN"], "void *");
    assert_eq!(
        defs["BhAPI_data_get_PROTO"],
        "(bhc_dtype dtype, const void *ary, bool copy2host)"
    );
    assert_eq!(defs["BhAPI_message_RETURN"], "const char *");
}

#[test]
fn test_generation_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    write_inputs(dir.path());

    let first = builder(dir.path()).build().unwrap();
    let header = fs::read(&first.header_path).unwrap();
    let info = fs::read(first.info_path.as_ref().unwrap()).unwrap();

    let second = builder(dir.path()).build().unwrap();
    assert_eq!(fs::read(&second.header_path).unwrap(), header);
    assert_eq!(fs::read(second.info_path.as_ref().unwrap()).unwrap(), info);
}

#[test]
fn test_missing_type_definitions_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    write_inputs(dir.path());
    fs::remove_file(dir.path().join("bhc_types.h")).unwrap();

    let err = builder(dir.path()).build().unwrap_err();

    assert!(matches!(err, ApiBuilderError::TypeDefinitionsNotFound(_)));
    assert!(!dir.path().join("out").exists());
}

#[test]
fn test_duplicate_export_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    write_inputs(dir.path());
    fs::write(
        dir.path().join("_bh_api.c"),
        "static void BhAPI_flush(void) {}\nstatic int BhAPI_flush(int a) { return a; }\n",
    )
    .unwrap();

    let err = builder(dir.path()).generate_header().unwrap_err();
    assert!(matches!(err, ApiBuilderError::ValidationError(_)));
}

#[test]
fn test_python_info_and_custom_names() {
    let dir = tempfile::tempdir().unwrap();
    write_inputs(dir.path());

    let names = ApiNames {
        prefix: "MyAPI".to_string(),
        capsule_key: "my_api._C_API".to_string(),
        ..ApiNames::default()
    };
    fs::write(
        dir.path().join("_bh_api.c"),
        "static int MyAPI_answer(void) { return 42; }\nstatic void BhAPI_flush(void) {}\n",
    )
    .unwrap();

    let output = builder(dir.path())
        .names(names)
        .info_format(InfoFormat::Python)
        .build()
        .unwrap();

    let header = fs::read_to_string(&output.header_path).unwrap();
    assert!(header.contains("#define MyAPI_answer_NUM 0\n"));
    assert!(header.contains("#define MyAPI_num_of_pointers 1\n"));
    assert!(header.contains("\"my_api._C_API\""));
    assert!(!header.contains("BhAPI_flush"));

    assert_eq!(output.info_path, Some(dir.path().join("out/_info.py")));
    let info = fs::read_to_string(output.info_path.unwrap()).unwrap();
    assert!(info.contains("__version__ = '1.2.3-47'\n"));
    assert!(info.contains("numpy.dtype('int32')"));
}

#[test]
fn test_header_only_without_tables() {
    let dir = tempfile::tempdir().unwrap();
    write_inputs(dir.path());

    let output = ApiBuilder::new()
        .provider_source(dir.path().join("_bh_api.c"))
        .type_definitions(dir.path().join("bhc_types.h"))
        .out_dir(dir.path().join("out"))
        .build()
        .unwrap();

    assert!(output.header_path.exists());
    assert_eq!(output.info_path, None);
}
