fn main() {
    // Client-only codegen for the Ascnd service
    let proto_root = "../../proto";
    let proto_path = "../../proto/ascnd/v1/ascnd.proto";

    tonic_build::configure()
        .build_server(false)
        .build_client(true)
        .compile_protos(&[proto_path], &[proto_root])
        .unwrap_or_else(|e| panic!("Failed to compile {}: {}", proto_path, e));

    println!("cargo:rerun-if-changed={}", proto_path);
}
