//! Fork lineage ("family tree") reconstruction.
//!
//! Projects only store a pointer to their parent. A family tree is rebuilt
//! on demand from the current project plus every project sharing its
//! master sound:
//!
//! 1. index all entries by id (the current project wins over duplicates)
//! 2. walk parent pointers up from the current project to find the root
//! 3. attach every entry to its parent when the parent is in the set
//! 4. walk down from the root; anything unreachable is reported as detached
//!
//! Cycles in the parent pointers cannot loop: both walks keep a visited set.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Flat lineage record, one per project
#[derive(Debug, Clone)]
pub struct LineageEntry {
    pub id: Uuid,
    pub parent_id: Option<Uuid>,
    pub title: String,
    pub creator_name: Option<String>,
    pub is_fork: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FamilyNode {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub title: String,
    pub creator_name: Option<String>,
    pub is_fork: bool,
    pub is_current: bool,
    pub created_at: DateTime<Utc>,
    pub children: Vec<FamilyNode>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FamilyTree {
    pub root: FamilyNode,
    /// Nodes reachable from the root
    pub size: usize,
    /// Number of levels (a lone project has depth 1)
    pub depth: usize,
    /// Related projects that could not be attached below the root
    pub detached: Vec<Uuid>,
}

/// Rebuild the family tree around `current`.
pub fn build_family_tree(current: LineageEntry, related: Vec<LineageEntry>) -> FamilyTree {
    let current_id = current.id;

    let mut entries: HashMap<Uuid, LineageEntry> = HashMap::with_capacity(related.len() + 1);
    for entry in related {
        if entry.id != current_id {
            entries.entry(entry.id).or_insert(entry);
        }
    }
    entries.insert(current_id, current);

    let root_id = find_root(&entries, current_id);
    let children = index_children(&entries);

    let mut visited = HashSet::with_capacity(entries.len());
    let mut depth = 0;
    let root = build_node(
        root_id,
        &entries,
        &children,
        current_id,
        &mut visited,
        1,
        &mut depth,
    );

    let mut detached: Vec<Uuid> = entries
        .keys()
        .filter(|id| !visited.contains(*id))
        .copied()
        .collect();
    detached.sort();

    FamilyTree {
        root,
        size: visited.len(),
        depth,
        detached,
    }
}

fn find_root(entries: &HashMap<Uuid, LineageEntry>, start: Uuid) -> Uuid {
    let mut root = start;
    let mut seen = HashSet::from([start]);

    while let Some(parent) = entries
        .get(&root)
        .and_then(|e| e.parent_id)
        .filter(|p| entries.contains_key(p))
    {
        if !seen.insert(parent) {
            break;
        }
        root = parent;
    }

    root
}

fn index_children(entries: &HashMap<Uuid, LineageEntry>) -> HashMap<Uuid, Vec<Uuid>> {
    let mut children: HashMap<Uuid, Vec<Uuid>> = HashMap::new();

    for entry in entries.values() {
        if let Some(parent) = entry.parent_id {
            if parent != entry.id && entries.contains_key(&parent) {
                children.entry(parent).or_default().push(entry.id);
            }
        }
    }

    for ids in children.values_mut() {
        ids.sort_by_key(|id| (entries[id].created_at, *id));
    }

    children
}

fn build_node(
    id: Uuid,
    entries: &HashMap<Uuid, LineageEntry>,
    children: &HashMap<Uuid, Vec<Uuid>>,
    current_id: Uuid,
    visited: &mut HashSet<Uuid>,
    level: usize,
    depth: &mut usize,
) -> FamilyNode {
    visited.insert(id);
    *depth = (*depth).max(level);

    let entry = &entries[&id];
    let mut node = FamilyNode {
        id,
        title: entry.title.clone(),
        creator_name: entry.creator_name.clone(),
        is_fork: entry.is_fork,
        is_current: id == current_id,
        created_at: entry.created_at,
        children: Vec::new(),
    };

    for child in children.get(&id).into_iter().flatten() {
        if visited.contains(child) {
            continue;
        }
        node.children.push(build_node(
            *child,
            entries,
            children,
            current_id,
            visited,
            level + 1,
            depth,
        ));
    }

    node
}
