//! Static server metadata.

#[derive(Debug, Clone, PartialEq)]
pub struct ServerInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub instructions: &'static str,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    pub name: &'static str,
    pub description: &'static str,
}

pub fn server_info() -> ServerInfo {
    ServerInfo {
        name: "scylla-gateway",
        version: env!("CARGO_PKG_VERSION"),
        instructions: "Send {\"action\": ..} objects to run CQL, or a list of them to batch",
    }
}

pub fn list_actions() -> Vec<Action> {
    vec![
        Action {
            name: "raw",
            description: "Execute one CQL statement or a list of statements",
        },
        Action {
            name: "prepared",
            description: "Execute a cached prepared statement once per value tuple",
        },
        Action {
            name: "prepare",
            description: "Compile statements into the prepared statement cache",
        },
        Action {
            name: "batch",
            description: "Fan a list of requests out concurrently and collect the replies",
        },
    ]
}
