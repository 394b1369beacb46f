//! Generated client/server code for `intentlayer.v2.GatewayService`.

tonic::include_proto!("intentlayer.v2");
