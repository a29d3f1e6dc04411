// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tool Surface (spec §4.7): a static registry of named operations, each
//! with a JSON schema for its arguments. No business logic lives here —
//! every handler just validates, unpacks `args`, and calls straight through
//! to a domain method.

use crate::fragment::{
    AdvancedQuery, CreateFragmentRequest, FilterMode, FragmentStore, SearchQuery as FragmentSearchQuery,
    SimilarityQuery, TraversalResult, UpdateFragmentPatch,
};
use crate::knowledge::{CreateIssueRequest, KnowledgeStore, SearchQuery as KnowledgeSearchQuery, UpdateIssuePatch};
use fleet_core::{
    ErrorKind, EntryStatus, Event, FleetError, FragmentId, KnowledgeId, LinkDirection, LinkType, Priority, ProcessId,
};
use fleet_engine::{
    cancel_running, EventBus, ProcessFilter, ProcessRegistry, Scheduler, StopOptions, SubmitOptions, Supervisor,
};
use serde_json::{json, Value};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct ToolDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub schema: Value,
}

/// The envelope every tool call wraps its result in (spec §4.7).
#[derive(Debug, Clone)]
pub struct ToolResponse {
    pub summary: String,
    pub details: Value,
}

impl ToolResponse {
    fn new(summary: impl Into<String>, details: Value) -> Self {
        Self { summary: summary.into(), details }
    }

    pub fn to_json(&self) -> Value {
        json!({
            "content": [
                {"type": "text", "text": self.summary},
                {"type": "text", "text": self.details},
            ]
        })
    }
}

pub struct Tools {
    pub registry: Arc<ProcessRegistry>,
    pub supervisor: Arc<Supervisor>,
    pub scheduler: Scheduler,
    pub knowledge: Arc<KnowledgeStore>,
    pub fragments: Arc<FragmentStore>,
    pub bus: EventBus,
}

/// The fixed set of operations exposed over the tool-call transport (spec
/// §4.7 "minimum set").
pub fn registry() -> Vec<ToolDescriptor> {
    vec![
        descriptor("process.start", "Submit a process to run", json!({
            "type": "object",
            "required": ["title", "command"],
            "properties": {
                "title": {"type": "string"},
                "command": {"type": "array", "items": {"type": "string"}},
                "priority": {"type": "integer", "minimum": 1, "maximum": 10},
                "immediate": {"type": "boolean"},
            }
        })),
        descriptor("process.stop", "Stop a running process", json!({
            "type": "object",
            "required": ["id"],
            "properties": {"id": {"type": "string"}, "force": {"type": "boolean"}, "timeoutMs": {"type": "integer"}}
        })),
        descriptor("process.list", "List processes matching a filter", json!({
            "type": "object",
            "properties": {"titleContains": {"type": "string"}}
        })),
        descriptor("process.get", "Get a single process record", json!({
            "type": "object", "required": ["id"], "properties": {"id": {"type": "string"}}
        })),
        descriptor("process.logs", "Read captured log lines", json!({
            "type": "object",
            "required": ["id"],
            "properties": {"id": {"type": "string"}, "stream": {"type": "string"}, "sinceId": {"type": "integer"}, "limit": {"type": "integer"}}
        })),
        descriptor("queue.status", "Read scheduler status", json!({"type": "object", "properties": {"includeEntries": {"type": "boolean"}}})),
        descriptor("queue.pause", "Pause dispatch", json!({"type": "object"})),
        descriptor("queue.resume", "Resume dispatch", json!({"type": "object"})),
        descriptor("queue.cancel", "Cancel a queued or running entry", json!({
            "type": "object", "required": ["id"], "properties": {"id": {"type": "string"}}
        })),
        descriptor("issue.create", "Create an issue", json!({
            "type": "object",
            "required": ["content"],
            "properties": {
                "content": {"type": "string"},
                "tags": {"type": "array", "items": {"type": "string"}},
                "priority": {"type": "string", "enum": ["low", "medium", "high"]},
            }
        })),
        descriptor("issue.get", "Get an issue by id", json!({"type": "object", "required": ["id"], "properties": {"id": {"type": "string"}}})),
        descriptor("issue.list", "Search issues", json!({"type": "object", "properties": {"status": {"type": "string"}, "fullText": {"type": "string"}}})),
        descriptor("issue.update", "Update an issue", json!({"type": "object", "required": ["id"], "properties": {"id": {"type": "string"}, "status": {"type": "string"}}})),
        descriptor("issue.delete", "Delete an issue", json!({"type": "object", "required": ["id"], "properties": {"id": {"type": "string"}}})),
        descriptor("milestone.get", "Get the milestone", json!({"type": "object"})),
        descriptor("milestone.set", "Update the milestone", json!({"type": "object", "properties": {"title": {"type": "string"}, "progress": {"type": "integer"}}})),
        descriptor("fragment.create", "Create a fragment", json!({
            "type": "object",
            "required": ["title", "body"],
            "properties": {"title": {"type": "string"}, "body": {"type": "string"}, "tags": {"type": "array", "items": {"type": "string"}}}
        })),
        descriptor("fragment.read", "Read a fragment by id", json!({"type": "object", "required": ["id"], "properties": {"id": {"type": "string"}}})),
        descriptor("fragment.update", "Update a fragment", json!({"type": "object", "required": ["id"], "properties": {"id": {"type": "string"}, "title": {"type": "string"}, "body": {"type": "string"}}})),
        descriptor("fragment.delete", "Delete a fragment", json!({"type": "object", "required": ["id"], "properties": {"id": {"type": "string"}}})),
        descriptor("fragment.list", "List all fragments", json!({"type": "object", "properties": {"limit": {"type": "integer"}}})),
        descriptor("fragment.searchByTitle", "Full-text search over fragments", json!({"type": "object", "properties": {"query": {"type": "string"}}})),
        descriptor("fragment.searchSimilar", "Vector similarity search", json!({
            "type": "object", "required": ["text"],
            "properties": {"text": {"type": "string"}, "limit": {"type": "integer"}, "threshold": {"type": "number"}}
        })),
        descriptor("fragment.searchAdvanced", "Combined vector+filter+text search", json!({
            "type": "object",
            "properties": {"text": {"type": "string"}, "fullText": {"type": "string"}, "filterMode": {"type": "string", "enum": ["pre", "post"]}}
        })),
        descriptor("fragment.stats", "Fragment store integrity report", json!({"type": "object"})),
        descriptor("link.create", "Create a fragment link", json!({
            "type": "object",
            "required": ["sourceId", "targetId", "linkType"],
            "properties": {"sourceId": {"type": "string"}, "targetId": {"type": "string"}, "linkType": {"type": "string"}}
        })),
        descriptor("link.delete", "Delete a fragment link", json!({"type": "object", "required": ["id"], "properties": {"id": {"type": "string"}}})),
        descriptor("link.query", "Query fragment links", json!({
            "type": "object", "properties": {"fragmentId": {"type": "string"}, "direction": {"type": "string"}}
        })),
        descriptor("link.traverse", "BFS traverse the fragment link graph", json!({
            "type": "object",
            "required": ["startId"],
            "properties": {"startId": {"type": "string"}, "maxDepth": {"type": "integer"}, "direction": {"type": "string"}}
        })),
        descriptor("link.fragmentWithLinks", "Get a fragment with its links", json!({"type": "object", "required": ["id"], "properties": {"id": {"type": "string"}}})),
    ]
}

fn descriptor(name: &'static str, description: &'static str, schema: Value) -> ToolDescriptor {
    ToolDescriptor { name, description, schema }
}

impl Tools {
    pub async fn call(&self, name: &str, args: Value) -> Result<ToolResponse, FleetError> {
        match name {
            "process.start" => self.process_start(args).await,
            "process.stop" => self.process_stop(args).await,
            "process.list" => self.process_list(args),
            "process.get" => self.process_get(args),
            "process.logs" => self.process_logs(args),
            "queue.status" => self.queue_status(args).await,
            "queue.pause" => self.queue_pause().await,
            "queue.resume" => self.queue_resume().await,
            "queue.cancel" => self.queue_cancel(args).await,
            "issue.create" => self.issue_create(args),
            "issue.get" => self.issue_get(args),
            "issue.list" => self.issue_list(args),
            "issue.update" => self.issue_update(args),
            "issue.delete" => self.issue_delete(args),
            "milestone.get" => self.milestone_get(),
            "milestone.set" => self.milestone_set(args),
            "fragment.create" => self.fragment_create(args).await,
            "fragment.read" => self.fragment_read(args),
            "fragment.update" => self.fragment_update(args).await,
            "fragment.delete" => self.fragment_delete(args),
            "fragment.list" => self.fragment_list(args),
            "fragment.searchByTitle" => self.fragment_search(args),
            "fragment.searchSimilar" => self.fragment_search_similar(args).await,
            "fragment.searchAdvanced" => self.fragment_search_advanced(args).await,
            "fragment.stats" => self.fragment_stats(),
            "link.create" => self.link_create(args),
            "link.delete" => self.link_delete(args),
            "link.query" => self.link_query(args),
            "link.traverse" => self.link_traverse(args),
            "link.fragmentWithLinks" => self.link_fragment_with_links(args),
            other => Err(FleetError::new(ErrorKind::InvalidRequest, format!("unknown tool {other:?}"))),
        }
    }

    async fn process_start(&self, args: Value) -> Result<ToolResponse, FleetError> {
        let title = require_str(&args, "title")?;
        let command = require_str_array(&args, "command")?;
        let priority = args.get("priority").and_then(Value::as_u64).unwrap_or(5) as u8;
        let immediate = args.get("immediate").and_then(Value::as_bool).unwrap_or(false);
        let spec = fleet_core::SpawnSpec {
            title,
            command,
            env: Default::default(),
            cwd: None,
        };
        let result = self.scheduler.submit(spec, SubmitOptions { priority, immediate }).await?;
        Ok(ToolResponse::new(
            format!("submitted process {} ({:?})", result.id, result.admission),
            json!({"id": result.id.as_str(), "admission": format!("{:?}", result.admission)}),
        ))
    }

    async fn process_stop(&self, args: Value) -> Result<ToolResponse, FleetError> {
        let id = ProcessId::new(require_str(&args, "id")?);
        let force = args.get("force").and_then(Value::as_bool).unwrap_or(false);
        let timeout_ms = args.get("timeoutMs").and_then(Value::as_u64);
        let record = self.supervisor.stop(&id, StopOptions { force, timeout_ms }).await?;
        Ok(ToolResponse::new(format!("stopped {id}"), process_summary(&record)))
    }

    fn process_list(&self, args: Value) -> Result<ToolResponse, FleetError> {
        let mut filter = ProcessFilter::default();
        if let Some(q) = args.get("titleContains").and_then(Value::as_str) {
            filter.title_contains = Some(q.to_string());
        }
        let records = self.registry.query(&filter, None, Default::default());
        Ok(ToolResponse::new(
            format!("{} processes", records.len()),
            json!(records.iter().map(process_summary).collect::<Vec<_>>()),
        ))
    }

    fn process_get(&self, args: Value) -> Result<ToolResponse, FleetError> {
        let id = ProcessId::new(require_str(&args, "id")?);
        let record = self.registry.get(&id).ok_or_else(|| FleetError::not_found(format!("no process {id}")))?;
        Ok(ToolResponse::new(format!("process {id}"), process_summary(&record)))
    }

    fn process_logs(&self, args: Value) -> Result<ToolResponse, FleetError> {
        let id = ProcessId::new(require_str(&args, "id")?);
        let stream = args.get("stream").and_then(Value::as_str).map(parse_stream).transpose()?;
        let since_id = args.get("sinceId").and_then(Value::as_u64);
        let limit = args.get("limit").and_then(Value::as_u64).map(|n| n as usize);
        let logs = self
            .registry
            .get_logs(&id, stream, since_id, limit)
            .ok_or_else(|| FleetError::not_found(format!("no process {id}")))?;
        Ok(ToolResponse::new(format!("{} log lines", logs.len()), json!(logs)))
    }

    async fn queue_status(&self, args: Value) -> Result<ToolResponse, FleetError> {
        let include_entries = args.get("includeEntries").and_then(Value::as_bool).unwrap_or(false);
        let status = self.scheduler.status(include_entries).await?;
        let entries: Option<Vec<Value>> = status.entries.as_ref().map(|entries| {
            entries
                .iter()
                .map(|e| json!({"processId": e.process_id.as_str(), "priority": e.priority, "attempt": e.attempt}))
                .collect()
        });
        Ok(ToolResponse::new(
            format!("running={} queued={} paused={}", status.running, status.queued, status.paused),
            json!({"running": status.running, "queued": status.queued, "paused": status.paused, "entries": entries}),
        ))
    }

    async fn queue_pause(&self) -> Result<ToolResponse, FleetError> {
        self.scheduler.pause().await;
        Ok(ToolResponse::new("paused", json!({})))
    }

    async fn queue_resume(&self) -> Result<ToolResponse, FleetError> {
        self.scheduler.resume().await;
        Ok(ToolResponse::new("resumed", json!({})))
    }

    async fn queue_cancel(&self, args: Value) -> Result<ToolResponse, FleetError> {
        let id = ProcessId::new(require_str(&args, "id")?);
        let mut cancelled = self.scheduler.cancel(id.clone()).await;
        // The scheduler only searches the queue heap; a running entry is
        // cancelled by stopping it through the supervisor instead (spec §4.3).
        if !cancelled && self.registry.get(&id).map(|r| r.status) == Some(fleet_core::ProcessStatus::Running) {
            cancel_running(&self.supervisor, &id).await?;
            cancelled = true;
        }
        Ok(ToolResponse::new(format!("cancelled={cancelled}"), json!({"cancelled": cancelled})))
    }

    fn issue_create(&self, args: Value) -> Result<ToolResponse, FleetError> {
        let content = require_str(&args, "content")?;
        let tags = args
            .get("tags")
            .and_then(Value::as_array)
            .map(|a| a.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
            .unwrap_or_default();
        let priority = args.get("priority").and_then(Value::as_str).map(parse_priority).transpose()?.unwrap_or(Priority::Medium);
        let issue = self.knowledge.create("ISSUE", CreateIssueRequest { content, tags, priority, ..Default::default() })?;
        self.bus.publish(Event::KnowledgeCreated { issue: issue.clone() });
        Ok(ToolResponse::new(format!("created {}", issue.id), issue_summary(&issue)))
    }

    fn issue_get(&self, args: Value) -> Result<ToolResponse, FleetError> {
        let id = KnowledgeId::new(require_str(&args, "id")?);
        let issue = self.knowledge.get(&id).ok_or_else(|| FleetError::not_found(format!("no issue {id}")))?;
        Ok(ToolResponse::new(format!("issue {id}"), issue_summary(&issue)))
    }

    fn issue_list(&self, args: Value) -> Result<ToolResponse, FleetError> {
        let mut query = KnowledgeSearchQuery::default();
        if let Some(s) = args.get("status").and_then(Value::as_str) {
            query.status = Some(parse_entry_status(s)?);
        }
        query.full_text = args.get("fullText").and_then(Value::as_str).map(str::to_string);
        let issues = self.knowledge.search(&query);
        Ok(ToolResponse::new(format!("{} issues", issues.len()), json!(issues.iter().map(issue_summary).collect::<Vec<_>>())))
    }

    fn issue_update(&self, args: Value) -> Result<ToolResponse, FleetError> {
        let id = KnowledgeId::new(require_str(&args, "id")?);
        let mut patch = UpdateIssuePatch::default();
        if let Some(s) = args.get("status").and_then(Value::as_str) {
            patch.status = Some(parse_entry_status(s)?);
        }
        let issue = self.knowledge.update(&id, patch)?;
        self.bus.publish(Event::KnowledgeUpdated { issue: issue.clone() });
        Ok(ToolResponse::new(format!("updated {id}"), issue_summary(&issue)))
    }

    fn issue_delete(&self, args: Value) -> Result<ToolResponse, FleetError> {
        let id = KnowledgeId::new(require_str(&args, "id")?);
        let deleted = self.knowledge.delete(&id);
        if deleted {
            self.bus.publish(Event::KnowledgeDeleted { id: id.as_str().to_string() });
        }
        Ok(ToolResponse::new(format!("deleted={deleted}"), json!({"deleted": deleted})))
    }

    fn milestone_get(&self) -> Result<ToolResponse, FleetError> {
        let milestone = self.knowledge.get_milestone();
        let details = match milestone {
            Some(m) => json!({"id": m.id.as_str(), "title": m.title, "progress": m.progress}),
            None => Value::Null,
        };
        Ok(ToolResponse::new("milestone", details))
    }

    fn milestone_set(&self, args: Value) -> Result<ToolResponse, FleetError> {
        let title = args.get("title").and_then(Value::as_str).map(str::to_string);
        let progress = args.get("progress").and_then(Value::as_u64).map(|n| n as u8);
        let milestone = self.knowledge.set_milestone(|m| {
            if let Some(title) = title {
                m.title = title;
            }
            if let Some(progress) = progress {
                m.set_progress(progress);
            }
        })?;
        self.bus.publish(Event::MilestoneUpdated { milestone: milestone.clone() });
        Ok(ToolResponse::new("milestone updated", json!({"id": milestone.id.as_str(), "progress": milestone.progress})))
    }

    async fn fragment_create(&self, args: Value) -> Result<ToolResponse, FleetError> {
        let title = require_str(&args, "title")?;
        let body = require_str(&args, "body")?;
        let tags = args
            .get("tags")
            .and_then(Value::as_array)
            .map(|a| a.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
            .unwrap_or_default();
        let fragment = self
            .fragments
            .create(CreateFragmentRequest { title, body, tags, ..Default::default() })
            .await
            .map_err(map_fragment_err)?;
        self.bus.publish(Event::FragmentCreated { fragment: fragment.clone() });
        Ok(ToolResponse::new(format!("created fragment {}", fragment.id), fragment_summary(&fragment)))
    }

    fn fragment_read(&self, args: Value) -> Result<ToolResponse, FleetError> {
        let id = FragmentId::new(require_str(&args, "id")?);
        let fragment = self.fragments.get(&id).ok_or_else(|| FleetError::not_found(format!("no fragment {id}")))?;
        Ok(ToolResponse::new(format!("fragment {id}"), fragment_summary(&fragment)))
    }

    async fn fragment_update(&self, args: Value) -> Result<ToolResponse, FleetError> {
        let id = FragmentId::new(require_str(&args, "id")?);
        let patch = UpdateFragmentPatch {
            title: args.get("title").and_then(Value::as_str).map(str::to_string),
            body: args.get("body").and_then(Value::as_str).map(str::to_string),
            ..Default::default()
        };
        let fragment = self.fragments.update(&id, patch).await.map_err(map_fragment_err)?;
        let fragment = fragment.ok_or_else(|| FleetError::not_found(format!("no fragment {id}")))?;
        self.bus.publish(Event::FragmentUpdated { fragment: fragment.clone() });
        Ok(ToolResponse::new(format!("updated fragment {id}"), fragment_summary(&fragment)))
    }

    fn fragment_delete(&self, args: Value) -> Result<ToolResponse, FleetError> {
        let id = FragmentId::new(require_str(&args, "id")?);
        let deleted = self.fragments.delete(&id);
        if deleted {
            self.bus.publish(Event::FragmentDeleted { id: id.as_str().to_string() });
        }
        Ok(ToolResponse::new(format!("deleted={deleted}"), json!({"deleted": deleted})))
    }

    fn fragment_list(&self, args: Value) -> Result<ToolResponse, FleetError> {
        let limit = args.get("limit").and_then(Value::as_u64).map(|n| n as usize);
        let fragments = self.fragments.get_all(limit);
        Ok(ToolResponse::new(format!("{} fragments", fragments.len()), json!(fragments.iter().map(fragment_summary).collect::<Vec<_>>())))
    }

    fn fragment_search(&self, args: Value) -> Result<ToolResponse, FleetError> {
        let query = FragmentSearchQuery {
            full_text: args.get("query").and_then(Value::as_str).map(str::to_string),
            ..Default::default()
        };
        let fragments = self.fragments.search(&query)?;
        Ok(ToolResponse::new(format!("{} fragments", fragments.len()), json!(fragments.iter().map(fragment_summary).collect::<Vec<_>>())))
    }

    async fn fragment_search_similar(&self, args: Value) -> Result<ToolResponse, FleetError> {
        let text = require_str(&args, "text")?;
        let limit = args.get("limit").and_then(Value::as_u64).unwrap_or(10) as usize;
        let threshold = args.get("threshold").and_then(Value::as_f64).unwrap_or(crate::fragment::DEFAULT_THRESHOLD as f64) as f32;
        let results = self
            .fragments
            .search_similar(&SimilarityQuery { text, limit, threshold, tags: Vec::new() })
            .await
            .map_err(map_fragment_err)?;
        Ok(ToolResponse::new(
            format!("{} results", results.len()),
            json!(results.iter().map(|(f, s)| json!({"fragment": fragment_summary(f), "score": s})).collect::<Vec<_>>()),
        ))
    }

    async fn fragment_search_advanced(&self, args: Value) -> Result<ToolResponse, FleetError> {
        let similarity = args.get("text").and_then(Value::as_str).map(|text| SimilarityQuery {
            text: text.to_string(),
            limit: 10,
            threshold: crate::fragment::DEFAULT_THRESHOLD,
            tags: Vec::new(),
        });
        let search = FragmentSearchQuery {
            full_text: args.get("fullText").and_then(Value::as_str).map(str::to_string),
            ..Default::default()
        };
        let filter_mode = match args.get("filterMode").and_then(Value::as_str) {
            Some("post") => FilterMode::Post,
            _ => FilterMode::Pre,
        };
        let result = self
            .fragments
            .search_advanced(&AdvancedQuery { similarity, search, filter_mode })
            .await
            .map_err(map_fragment_err)?;
        Ok(ToolResponse::new(
            format!("{} results via {:?}", result.fragments.len(), result.strategy_used),
            json!({
                "strategyUsed": format!("{:?}", result.strategy_used),
                "fragments": result.fragments.iter().map(|(f, s)| json!({"fragment": fragment_summary(f), "score": s})).collect::<Vec<_>>(),
            }),
        ))
    }

    fn fragment_stats(&self) -> Result<ToolResponse, FleetError> {
        let report = self.fragments.integrity_report();
        Ok(ToolResponse::new(
            format!("healthy={}", report.is_healthy),
            json!({
                "count": self.fragments.count(),
                "isHealthy": report.is_healthy,
                "orphanedLinks": report.orphaned.len(),
                "duplicateGroups": report.duplicate_groups.len(),
            }),
        ))
    }

    fn link_create(&self, args: Value) -> Result<ToolResponse, FleetError> {
        let source = FragmentId::new(require_str(&args, "sourceId")?);
        let target = FragmentId::new(require_str(&args, "targetId")?);
        let link_type = parse_link_type(&require_str(&args, "linkType")?)?;
        let link = self
            .fragments
            .create_link(source, target, link_type, None)
            .ok_or_else(|| FleetError::invalid("a link cannot connect a fragment to itself"))?;
        self.bus.publish(Event::LinkCreated { link: link.clone() });
        Ok(ToolResponse::new(format!("created link {}", link.id), json!({"id": link.id.as_str()})))
    }

    fn link_delete(&self, args: Value) -> Result<ToolResponse, FleetError> {
        let id = fleet_core::LinkId::new(require_str(&args, "id")?);
        let deleted = self.fragments.delete_link(&id);
        if deleted {
            self.bus.publish(Event::LinkDeleted { id: id.as_str().to_string() });
        }
        Ok(ToolResponse::new(format!("deleted={deleted}"), json!({"deleted": deleted})))
    }

    fn link_query(&self, args: Value) -> Result<ToolResponse, FleetError> {
        let fragment_id = args.get("fragmentId").and_then(Value::as_str).map(|s| FragmentId::new(s.to_string()));
        let direction = args.get("direction").and_then(Value::as_str).map(parse_direction).transpose()?.unwrap_or(LinkDirection::Both);
        let links = self.fragments.query_links(fragment_id.as_ref(), None, None, None, direction, 0, 0);
        Ok(ToolResponse::new(format!("{} links", links.len()), json!(links.iter().map(|l| l.id.as_str()).collect::<Vec<_>>())))
    }

    fn link_traverse(&self, args: Value) -> Result<ToolResponse, FleetError> {
        let start = FragmentId::new(require_str(&args, "startId")?);
        let max_depth = args.get("maxDepth").and_then(Value::as_u64).unwrap_or(3) as u32;
        let direction = args.get("direction").and_then(Value::as_str).map(parse_direction).transpose()?.unwrap_or(LinkDirection::Both);
        let result = self.fragments.traverse(&start, max_depth, None, direction, true);
        Ok(ToolResponse::new(
            format!("{} nodes reached", result.total_nodes),
            traversal_summary(&result),
        ))
    }

    fn link_fragment_with_links(&self, args: Value) -> Result<ToolResponse, FleetError> {
        let id = FragmentId::new(require_str(&args, "id")?);
        let fragment = self.fragments.get(&id).ok_or_else(|| FleetError::not_found(format!("no fragment {id}")))?;
        let links = self.fragments.get_links_for_fragment(&id, LinkDirection::Both);
        Ok(ToolResponse::new(
            format!("fragment {id} with {} links", links.len()),
            json!({"fragment": fragment_summary(&fragment), "links": links.iter().map(link_summary).collect::<Vec<_>>()}),
        ))
    }
}

fn require_str(args: &Value, field: &str) -> Result<String, FleetError> {
    args.get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| FleetError::invalid(format!("missing required field {field:?}")))
}

fn require_str_array(args: &Value, field: &str) -> Result<Vec<String>, FleetError> {
    args.get(field)
        .and_then(Value::as_array)
        .map(|a| a.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
        .filter(|v: &Vec<String>| !v.is_empty())
        .ok_or_else(|| FleetError::invalid(format!("missing required field {field:?}")))
}

fn parse_stream(s: &str) -> Result<fleet_core::LogStream, FleetError> {
    match s {
        "stdout" => Ok(fleet_core::LogStream::Stdout),
        "stderr" => Ok(fleet_core::LogStream::Stderr),
        "system" => Ok(fleet_core::LogStream::System),
        other => Err(FleetError::invalid(format!("unknown stream {other:?}"))),
    }
}

fn parse_priority(s: &str) -> Result<Priority, FleetError> {
    match s {
        "low" => Ok(Priority::Low),
        "medium" => Ok(Priority::Medium),
        "high" => Ok(Priority::High),
        other => Err(FleetError::invalid(format!("unknown priority {other:?}"))),
    }
}

fn parse_entry_status(s: &str) -> Result<EntryStatus, FleetError> {
    EntryStatus::ALL
        .into_iter()
        .find(|st| st.folder() == s)
        .ok_or_else(|| FleetError::invalid(format!("unknown status {s:?}")))
}

fn parse_link_type(s: &str) -> Result<LinkType, FleetError> {
    match s {
        "answers" => Ok(LinkType::Answers),
        "references" => Ok(LinkType::References),
        "related" => Ok(LinkType::Related),
        "supersedes" => Ok(LinkType::Supersedes),
        other => Err(FleetError::invalid(format!("unknown link type {other:?}"))),
    }
}

fn parse_direction(s: &str) -> Result<LinkDirection, FleetError> {
    match s {
        "outgoing" => Ok(LinkDirection::Outgoing),
        "incoming" => Ok(LinkDirection::Incoming),
        "both" => Ok(LinkDirection::Both),
        other => Err(FleetError::invalid(format!("unknown direction {other:?}"))),
    }
}

fn process_summary(record: &fleet_core::ProcessRecord) -> Value {
    json!({
        "id": record.id.as_str(),
        "title": record.title,
        "status": format!("{:?}", record.status),
        "priority": record.priority,
        "exitCode": record.exit_code,
    })
}

fn issue_summary(issue: &fleet_core::Issue) -> Value {
    json!({
        "id": issue.id.as_str(),
        "status": issue.status.folder(),
        "priority": format!("{:?}", issue.priority),
        "tags": issue.tags,
    })
}

fn fragment_summary(fragment: &fleet_core::Fragment) -> Value {
    json!({
        "id": fragment.id.as_str(),
        "title": fragment.title,
        "kind": format!("{:?}", fragment.kind),
        "status": format!("{:?}", fragment.status),
        "tags": fragment.tags,
    })
}

fn link_summary(link: &fleet_core::FragmentLink) -> Value {
    json!({
        "id": link.id.as_str(),
        "sourceId": link.source_id.as_str(),
        "targetId": link.target_id.as_str(),
        "linkType": link.link_type.as_str(),
    })
}

fn traversal_summary(result: &TraversalResult) -> Value {
    json!({
        "startFragment": result.start_fragment.as_str(),
        "totalNodes": result.total_nodes,
        "maxDepthReached": result.max_depth_reached,
        "cyclesDetected": result.cycles_detected,
    })
}

fn map_fragment_err(e: crate::fragment::FragmentStoreError) -> FleetError {
    e.into()
}

#[cfg(test)]
#[path = "tools_tests.rs"]
mod tests;
