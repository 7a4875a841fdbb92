// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Older protoc releases need this flag for proto3 `optional` fields.
    let mut config = prost_build::Config::new();
    config.protoc_arg("--experimental_allow_proto3_optional");
    tonic_build::configure()
        .build_client(false)
        .compile_with_config(config,
                             &["src/proto/star_match.proto"],
                             &["src/proto"])?;
    Ok(())
}
