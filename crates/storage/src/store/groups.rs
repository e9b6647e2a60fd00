// SPDX-License-Identifier: MIT

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use thrum_core::{AgentId, Group, GroupId, GroupMember};

use crate::errors::StorageError;

use super::Store;

fn row_to_group(row: &rusqlite::Row) -> rusqlite::Result<Group> {
    Ok(Group {
        group_id: row.get("group_id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        created_at: row.get("created_at")?,
        created_by: row.get("created_by")?,
    })
}

fn row_to_member(row: &rusqlite::Row) -> rusqlite::Result<GroupMember> {
    let member_type: String = row.get("member_type")?;
    let member_value: String = row.get("member_value")?;
    Ok(match member_type.as_str() {
        "agent" => GroupMember::Agent { member_value: AgentId::from_string(member_value) },
        _ => GroupMember::Role { member_value },
    })
}

pub fn create(conn: &Connection, group: &Group) -> Result<(), StorageError> {
    conn.execute(
        "INSERT INTO groups (group_id, name, description, created_at, created_by) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![group.group_id, group.name, group.description, group.created_at.to_rfc3339(), group.created_by],
    )?;
    Ok(())
}

pub fn delete(conn: &Connection, group_id: &GroupId) -> Result<(), StorageError> {
    conn.execute("DELETE FROM groups WHERE group_id = ?1", params![group_id])?;
    Ok(())
}

pub fn get_by_id(conn: &Connection, group_id: &GroupId) -> Result<Option<Group>, StorageError> {
    conn.query_row("SELECT * FROM groups WHERE group_id = ?1", params![group_id], row_to_group).optional().map_err(Into::into)
}

pub fn get_by_name(conn: &Connection, name: &str) -> Result<Option<Group>, StorageError> {
    conn.query_row("SELECT * FROM groups WHERE name = ?1", params![name], row_to_group).optional().map_err(Into::into)
}

pub fn is_group(conn: &Connection, name: &str) -> Result<bool, StorageError> {
    Ok(get_by_name(conn, name)?.is_some())
}

pub fn list(conn: &Connection) -> Result<Vec<Group>, StorageError> {
    let mut stmt = conn.prepare("SELECT * FROM groups ORDER BY created_at ASC")?;
    let rows = stmt.query_map([], row_to_group)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
}

pub fn add_member(
    conn: &Connection,
    group_id: &GroupId,
    member: &GroupMember,
    added_at: DateTime<Utc>,
    added_by: Option<&AgentId>,
) -> Result<(), StorageError> {
    let (member_type, member_value) = match member {
        GroupMember::Agent { member_value } => ("agent", member_value.as_str().to_string()),
        GroupMember::Role { member_value } => ("role", member_value.clone()),
    };
    conn.execute(
        "INSERT INTO group_members (group_id, member_type, member_value, added_at, added_by)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(group_id, member_type, member_value) DO NOTHING",
        params![group_id, member_type, member_value, added_at.to_rfc3339(), added_by],
    )?;
    Ok(())
}

pub fn remove_member(conn: &Connection, group_id: &GroupId, member: &GroupMember) -> Result<(), StorageError> {
    let (member_type, member_value) = match member {
        GroupMember::Agent { member_value } => ("agent", member_value.as_str().to_string()),
        GroupMember::Role { member_value } => ("role", member_value.clone()),
    };
    conn.execute(
        "DELETE FROM group_members WHERE group_id = ?1 AND member_type = ?2 AND member_value = ?3",
        params![group_id, member_type, member_value],
    )?;
    Ok(())
}

pub fn members(conn: &Connection, group_id: &GroupId) -> Result<Vec<GroupMember>, StorageError> {
    let mut stmt = conn.prepare("SELECT * FROM group_members WHERE group_id = ?1 ORDER BY added_at ASC")?;
    let rows = stmt.query_map(params![group_id], row_to_member)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
}

/// `GroupResolver.ExpandMembers`: resolves a group's flat member list into
/// the set of agent ids currently matching it.
pub fn expand_members(conn: &Connection, name: &str) -> Result<Vec<AgentId>, StorageError> {
    let Some(group) = get_by_name(conn, name)? else {
        return Ok(Vec::new());
    };
    let members = members(conn, &group.group_id)?;

    let mut out = Vec::new();
    for member in members {
        match member {
            GroupMember::Agent { member_value } => out.push(member_value),
            GroupMember::Role { member_value } => {
                if member_value == "*" {
                    let mut stmt = conn.prepare("SELECT agent_id FROM agents")?;
                    let ids = stmt.query_map([], |r| r.get::<_, AgentId>(0))?;
                    out.extend(ids.collect::<Result<Vec<_>, _>>()?);
                } else {
                    let mut stmt = conn.prepare("SELECT agent_id FROM agents WHERE role = ?1")?;
                    let ids = stmt.query_map(params![member_value], |r| r.get::<_, AgentId>(0))?;
                    out.extend(ids.collect::<Result<Vec<_>, _>>()?);
                }
            }
        }
    }
    out.sort();
    out.dedup();
    Ok(out)
}

/// Does `name`'s membership contain `(agent, agent_id)`, `(role, role)`, or
/// `(role, "*")`? Used by the inbox query's group-scope arm (spec.md §4.5.2).
pub fn group_matches_agent(conn: &Connection, name: &str, agent_id: &AgentId, role: &str) -> Result<bool, StorageError> {
    let Some(group) = get_by_name(conn, name)? else {
        return Ok(false);
    };
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM group_members WHERE group_id = ?1
         AND ((member_type = 'agent' AND member_value = ?2)
              OR (member_type = 'role' AND (member_value = ?3 OR member_value = '*')))",
        params![group.group_id, agent_id, role],
        |r| r.get(0),
    )?;
    Ok(count > 0)
}

impl Store {
    pub fn create_group(&self, group: &Group) -> Result<(), StorageError> {
        create(&self.conn, group)
    }

    pub fn delete_group(&self, group_id: &GroupId) -> Result<(), StorageError> {
        delete(&self.conn, group_id)
    }

    pub fn get_group_by_name(&self, name: &str) -> Result<Option<Group>, StorageError> {
        get_by_name(&self.conn, name)
    }

    pub fn get_group(&self, group_id: &GroupId) -> Result<Option<Group>, StorageError> {
        get_by_id(&self.conn, group_id)
    }

    pub fn is_group(&self, name: &str) -> Result<bool, StorageError> {
        is_group(&self.conn, name)
    }

    pub fn list_groups(&self) -> Result<Vec<Group>, StorageError> {
        list(&self.conn)
    }

    pub fn group_members(&self, group_id: &GroupId) -> Result<Vec<GroupMember>, StorageError> {
        members(&self.conn, group_id)
    }

    pub fn expand_group_members(&self, name: &str) -> Result<Vec<AgentId>, StorageError> {
        expand_members(&self.conn, name)
    }
}
