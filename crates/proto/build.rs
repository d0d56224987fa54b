fn main() -> Result<(), Box<dyn std::error::Error>> {
    // realm.proto: RealmManagerService (realm_mgr.v1)
    tonic_prost_build::configure()
        .build_server(true)
        .build_client(true)
        .compile_protos(&["proto/realm_mgr/v1/realm.proto"], &["proto/"])?;

    println!("cargo:rerun-if-changed=proto/realm_mgr/v1/realm.proto");

    Ok(())
}
