// Generated by tonic-build from proto/*.proto

pub mod common {
    tonic::include_proto!("lostfound.common");
}

pub mod items {
    tonic::include_proto!("lostfound.items");
}

pub mod dashboard {
    tonic::include_proto!("lostfound.dashboard");
}

pub mod auth {
    tonic::include_proto!("lostfound.auth");
}

pub mod health {
    tonic::include_proto!("grpc.health.v1");
}

/// Encoded file descriptor set for gRPC reflection
pub const FILE_DESCRIPTOR_SET: &[u8] = tonic::include_file_descriptor_set!("lostfound_descriptor");
