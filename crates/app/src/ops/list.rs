use std::fmt::Write;

use clap::Args;

use common::scenario::{KeyExchange, Scenario};

#[derive(Args, Debug, Clone)]
pub struct List {
    /// Include each node's action list
    #[arg(long)]
    pub actions: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum ListError {
    #[error("List operation failed: {0}")]
    Failed(#[from] std::fmt::Error),
}

pub fn describe(scenario: &Scenario, actions: bool) -> Result<String, std::fmt::Error> {
    let mut out = String::new();
    writeln!(out, "{}", scenario.name)?;
    for node in &scenario.nodes {
        writeln!(out, "  - {} [{}]", node.name, node.listen_addr)?;
        if actions {
            for line in node.actions.lines() {
                writeln!(out, "      {}", line)?;
            }
        }
    }
    for link in &scenario.bootstrap {
        writeln!(out, "  bootstrap: {} -> {}", link.from, link.to)?;
    }
    match &scenario.key_exchange {
        KeyExchange::Full => writeln!(out, "  keys: full exchange")?,
        KeyExchange::Links(links) => {
            for link in links {
                writeln!(out, "  keys: {} holds {}", link.from, link.to)?;
            }
        }
    }
    Ok(out)
}

#[async_trait::async_trait]
impl crate::op::Op for List {
    type Error = ListError;
    type Output = String;

    async fn execute(&self, _ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let mut out = String::new();
        for scenario in Scenario::builtin() {
            out.push_str(&describe(&scenario, self.actions)?);
        }
        Ok(out.trim_end().to_string())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_describe_three_node_chain() {
        let text = describe(&Scenario::three_node_chain(), true).unwrap();
        assert!(text.starts_with("test2\n"));
        assert!(text.contains("  - node3 [127.0.0.1:30303]\n"));
        assert!(text.contains("  bootstrap: node3 -> node2\n"));
        assert!(text.contains("  keys: full exchange\n"));
        assert!(text.contains("      SEND|SELF|node1|D|Hello, I am Node3.\n"));
    }
}
