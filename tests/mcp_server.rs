//! Tests for MCP Server implementation.

use codeengine::mcp::CodeEngineServer;
use codeengine::CodeEngineClient;
use rmcp::handler::server::ServerHandler;

#[test]
fn server_implements_server_handler() {
    fn assert_server_handler<T: ServerHandler>() {}
    assert_server_handler::<CodeEngineServer>();
}

#[test]
fn get_info_names_the_server() {
    let client = CodeEngineClient::new("test-token", "http://127.0.0.1:9").unwrap();
    let server = CodeEngineServer::new(client);

    let info = server.get_info();
    assert_eq!(info.server_info.name, "codeengine");
    assert_eq!(info.server_info.version, env!("CARGO_PKG_VERSION"));
    assert!(info.capabilities.tools.is_some());
    assert!(info.instructions.unwrap_or_default().contains("config maps"));
}

#[test]
fn server_is_clone() {
    fn assert_clone<T: Clone>() {}
    assert_clone::<CodeEngineServer>();
}

#[test]
fn server_is_send_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<CodeEngineServer>();
}
