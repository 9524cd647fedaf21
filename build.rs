use std::path::PathBuf;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let out_dir = PathBuf::from(std::env::var("OUT_DIR")?);
    let proto_dir = PathBuf::from("proto");

    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=proto/");

    // `protoc` is not available on PATH in this environment; point prost/tonic
    // at the vendored binary so the proto compilation below can run.
    if std::env::var_os("PROTOC").is_none() {
        let protoc = protoc_bin_vendored::protoc_bin_path()?;
        std::env::set_var("PROTOC", protoc);
    }

    // Compile the proto files from the local proto/ directory
    tonic_build::configure()
        .build_server(true)
        .build_client(false)
        .file_descriptor_set_path(out_dir.join("turnstile_admission_descriptor.bin"))
        .compile_protos(
            &[proto_dir.join("turnstile/v1/admission.proto")],
            &[&proto_dir],
        )?;

    Ok(())
}
