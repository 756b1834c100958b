const PHASE: &str = r#"#[serde(with = "crate::serde_enum::workflow_execution_phase")]"#;
const RESOURCE_TYPE: &str = r#"#[serde(with = "crate::serde_enum::matchable_resource")]"#;

fn main() {
    let protoc_path =
        protoc_bin_vendored::protoc_bin_path().expect("failed to find bundled protoc");
    std::env::set_var("PROTOC", protoc_path);

    let out_dir = std::path::PathBuf::from(std::env::var("OUT_DIR").expect("OUT_DIR is set by cargo"));

    println!("cargo:rerun-if-changed=proto/admin.proto");
    tonic_build::configure()
        .file_descriptor_set_path(out_dir.join("admin_descriptor.bin"))
        .build_server(true)
        .build_client(true)
        // The REST transcoder reads and writes these messages as JSON.
        .type_attribute(".", "#[derive(serde::Serialize, serde::Deserialize)]")
        .message_attribute(".", "#[serde(default)]")
        // Enum fields are i32 in Rust; JSON carries their names.
        .field_attribute(
            ".flowgate.admin.v1.WorkflowExecutionEvent.phase",
            PHASE,
        )
        .field_attribute(".flowgate.admin.v1.ExecutionClosure.phase", PHASE)
        .field_attribute(
            ".flowgate.admin.v1.Sort.direction",
            r#"#[serde(with = "crate::serde_enum::sort_direction")]"#,
        )
        .field_attribute(".flowgate.admin.v1.ProjectDomainAttributesGetRequest.resource_type", RESOURCE_TYPE)
        .field_attribute(".flowgate.admin.v1.ProjectDomainAttributesDeleteRequest.resource_type", RESOURCE_TYPE)
        .field_attribute(".flowgate.admin.v1.WorkflowAttributesGetRequest.resource_type", RESOURCE_TYPE)
        .field_attribute(".flowgate.admin.v1.WorkflowAttributesDeleteRequest.resource_type", RESOURCE_TYPE)
        .field_attribute(".flowgate.admin.v1.LaunchPlanAttributesGetRequest.resource_type", RESOURCE_TYPE)
        .field_attribute(".flowgate.admin.v1.LaunchPlanAttributesDeleteRequest.resource_type", RESOURCE_TYPE)
        .compile(&["proto/admin.proto"], &["proto"])
        .expect("failed to compile gRPC definitions");
}
