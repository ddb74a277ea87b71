/// Common utilities for Jira MCP Gateway integration tests
use jira_mcp_gateway::config::JiraConfig;
use jira_mcp_gateway::context::{ContextResolver, RequestState};
use jira_mcp_gateway::dispatch::JiraToolDispatcher;
use jira_mcp_gateway::test_support::{InMemoryFetcher, InMemoryFetcherFactory};
use serde_json::{json, Value};
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static REQUEST_ID: AtomicU64 = AtomicU64::new(1);

/// Environment variables that would point the spawned server at a real Jira
const JIRA_ENV: &[&str] = &[
    "JIRA_URL",
    "JIRA_AUTH_TYPE",
    "JIRA_TOKEN",
    "JIRA_USERNAME",
    "JIRA_PASSWORD",
    "JIRA_PROJECTS_FILTER",
    "READ_ONLY_MODE",
    "ATLASSIAN_OAUTH_ACCESS_TOKEN",
];

/// Global configuration of an unreachable test instance
#[allow(dead_code)]
pub fn test_config() -> JiraConfig {
    JiraConfig {
        jira_url: "https://test.atlassian.net".to_string(),
        ..Default::default()
    }
}

/// Dispatcher without global configuration plus a session carrying `fetcher`
#[allow(dead_code)]
pub fn dispatcher_with(fetcher: Arc<InMemoryFetcher>) -> (JiraToolDispatcher, RequestState) {
    let resolver = ContextResolver::new(None, Arc::new(InMemoryFetcherFactory::new()));
    (
        JiraToolDispatcher::new(resolver),
        RequestState::with_fetcher(fetcher),
    )
}

/// Dispatcher whose global fetchers come from `factory`
#[allow(dead_code)]
pub fn dispatcher_from_factory(
    config: Option<JiraConfig>,
    factory: Arc<InMemoryFetcherFactory>,
) -> JiraToolDispatcher {
    JiraToolDispatcher::new(ContextResolver::new(config, factory))
}

/// MCP Test Client for sending JSON-RPC requests to the server binary
#[allow(dead_code)]
pub struct McpTestClient {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

#[allow(dead_code)]
impl McpTestClient {
    /// Spawn the server without any Jira configuration
    pub fn unconfigured() -> Result<Self, Box<dyn std::error::Error>> {
        let mut command = Command::new(env!("CARGO_BIN_EXE_jira-mcp-gateway"));
        for var in JIRA_ENV {
            command.env_remove(var);
        }

        let mut child = command
            .env("RUST_LOG", "error")
            .current_dir(env!("CARGO_MANIFEST_DIR"))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()?;

        let stdin = child.stdin.take().ok_or("Failed to open stdin")?;
        let stdout = child.stdout.take().ok_or("Failed to open stdout")?;

        let mut client = Self {
            child,
            stdin,
            stdout: BufReader::new(stdout),
        };
        client.initialize()?;
        Ok(client)
    }

    /// Initialize the MCP session
    fn initialize(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let request = json!({
            "jsonrpc": "2.0",
            "id": 0,
            "method": "initialize",
            "params": {
                "protocolVersion": "2024-11-05",
                "capabilities": {},
                "clientInfo": {
                    "name": "rust-test-client",
                    "version": "1.0.0"
                }
            }
        });

        self.send_request(&request)?;
        let response = self.read_response()?;

        if response.get("error").is_some() {
            return Err(format!("Initialization failed: {:?}", response["error"]).into());
        }

        Ok(())
    }

    /// List the tools advertised by the server
    pub fn list_tools(&mut self) -> Result<Value, Box<dyn std::error::Error>> {
        let request = json!({
            "jsonrpc": "2.0",
            "id": REQUEST_ID.fetch_add(1, Ordering::SeqCst),
            "method": "tools/list",
            "params": {}
        });

        self.send_request(&request)?;
        self.read_response()
    }

    /// Call an MCP tool
    pub fn call_tool(
        &mut self,
        tool_name: &str,
        arguments: Value,
    ) -> Result<Value, Box<dyn std::error::Error>> {
        let request = json!({
            "jsonrpc": "2.0",
            "id": REQUEST_ID.fetch_add(1, Ordering::SeqCst),
            "method": "tools/call",
            "params": {
                "name": tool_name,
                "arguments": arguments
            }
        });

        self.send_request(&request)?;
        self.read_response()
    }

    fn send_request(&mut self, request: &Value) -> Result<(), Box<dyn std::error::Error>> {
        let request_str = serde_json::to_string(request)?;
        writeln!(self.stdin, "{}", request_str)?;
        self.stdin.flush()?;
        Ok(())
    }

    fn read_response(&mut self) -> Result<Value, Box<dyn std::error::Error>> {
        let mut line = String::new();
        self.stdout.read_line(&mut line)?;

        if line.is_empty() {
            return Err("Server closed connection".into());
        }

        Ok(serde_json::from_str(&line)?)
    }

    /// Extract the text content of a tool result
    pub fn extract_tool_text(response: &Value) -> Result<String, String> {
        if let Some(error) = response.get("error") {
            return Err(format!("Tool call failed: {:?}", error));
        }

        let content = response
            .get("result")
            .and_then(|result| result.get("content"))
            .and_then(Value::as_array)
            .ok_or("No content in result")?;

        content
            .iter()
            .find(|item| item.get("type") == Some(&Value::String("text".to_string())))
            .and_then(|item| item.get("text"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| "No text content found".to_string())
    }
}

impl Drop for McpTestClient {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}
