fn main() -> Result<(), Box<dyn std::error::Error>> {
    let out_dir = std::path::PathBuf::from(std::env::var("OUT_DIR")?);

    // Compile proto files with file descriptor for reflection
    tonic_build::configure()
        .build_server(true)
        .build_client(true)
        .file_descriptor_set_path(out_dir.join("lostfound_descriptor.bin"))
        .compile_protos(
            &[
                "proto/common.proto",
                "proto/items.proto",
                "proto/dashboard.proto",
                "proto/auth.proto",
                "proto/health.proto",
            ],
            &["proto"],
        )?;

    // Rerun if proto files change
    println!("cargo:rerun-if-changed=proto/");
    println!("cargo:rerun-if-changed=migrations/");

    Ok(())
}
