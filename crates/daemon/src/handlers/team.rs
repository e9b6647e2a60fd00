// SPDX-License-Identifier: MIT

//! `team.list` (spec.md §3 "Agent"): the repo's roster grouped by module,
//! the unit collaborators usually care about ("who's working in `core`
//! right now") rather than the flat agent table `agent.list` returns.

use serde::Serialize;
use std::collections::BTreeMap;
use thrum_core::Agent;

use super::{to_json, HandlerContext, HandlerResult};

#[derive(Serialize)]
struct TeamView {
    module: String,
    agents: Vec<Agent>,
}

pub fn list(ctx: &HandlerContext, _params: Option<serde_json::Value>) -> HandlerResult {
    let agents = ctx.state.read(|s| s.list_agents())?;

    let mut by_module: BTreeMap<String, Vec<Agent>> = BTreeMap::new();
    for agent in agents {
        by_module.entry(agent.module.clone()).or_default().push(agent);
    }

    let teams: Vec<TeamView> = by_module.into_iter().map(|(module, agents)| TeamView { module, agents }).collect();
    to_json(teams)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::dispatcher::Registry;
    use crate::state::StateLock;
    use std::sync::Arc;
    use std::time::Instant;
    use thrum_core::event::{AgentRegisterPayload, AgentRegisterReason};
    use thrum_core::{AgentId, Event};

    fn fresh_ctx() -> HandlerContext {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(Some(dir.path().to_path_buf())).unwrap();
        std::mem::forget(dir);
        let state = StateLock::open(&config, "test-daemon").unwrap();
        HandlerContext { state, registry: Registry::new(), config: Arc::new(config), start_time: Instant::now(), transport: super::super::TransportKind::Unix }
    }

    fn register(ctx: &HandlerContext, agent_id: &str, role: &str, module: &str) {
        ctx.state
            .write(|s| {
                s.commit(Event::AgentRegister(AgentRegisterPayload {
                    agent_id: AgentId::from_string(agent_id),
                    role: role.into(),
                    module: module.into(),
                    display: None,
                    hostname: None,
                    reason: AgentRegisterReason::Normal,
                }))
            })
            .unwrap();
    }

    #[test]
    fn agents_are_grouped_by_module() {
        let ctx = fresh_ctx();
        register(&ctx, "agent:implementer:core:111111111111", "implementer", "core");
        register(&ctx, "agent:reviewer:core:222222222222", "reviewer", "core");
        register(&ctx, "agent:implementer:wire:333333333333", "implementer", "wire");

        let teams = list(&ctx, None).unwrap();
        let teams = teams.as_array().unwrap();
        assert_eq!(teams.len(), 2);
        assert_eq!(teams[0]["module"], serde_json::json!("core"));
        assert_eq!(teams[0]["agents"].as_array().unwrap().len(), 2);
        assert_eq!(teams[1]["module"], serde_json::json!("wire"));
    }
}
