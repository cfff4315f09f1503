//! Cluster membership reporting.
//!
//! Groups the finalized cluster assignments by cluster id and renders them
//! to any writer, so tests read the report without capturing stdout. The
//! optional text mode resolves each member back to its persisted record
//! value.

use std::collections::BTreeMap;
use std::io::{self, Write};

use thiserror::Error;

use crate::cluster::ClusteredPoint;
use crate::store::{self, DocumentRecord, OutputLayout, StoreError};
use crate::types::{ClusterId, SentenceId};

#[derive(Error, Debug)]
pub enum ReportError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("failed to render report: {0}")]
    Render(#[from] io::Error),
}

/// Final run report: per-cluster membership plus the explicitly unassigned
/// set. Members are ordered by sentence id within each cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterReport {
    clusters: BTreeMap<ClusterId, Vec<String>>,
    unassigned: Vec<String>,
}

impl ClusterReport {
    /// Group clustered points by their assignment decision.
    pub fn from_points(points: &[ClusteredPoint]) -> Self {
        let mut clusters: BTreeMap<ClusterId, Vec<String>> = BTreeMap::new();
        let mut unassigned = Vec::new();
        for point in points {
            match point.cluster_id {
                Some(id) => clusters.entry(id).or_default().push(point.name.clone()),
                None => unassigned.push(point.name.clone()),
            }
        }
        for members in clusters.values_mut() {
            sort_by_sentence_order(members);
        }
        sort_by_sentence_order(&mut unassigned);
        Self {
            clusters,
            unassigned,
        }
    }

    /// Rebuild the report from a persisted `results/` store.
    pub fn load(layout: &OutputLayout) -> Result<Self, ReportError> {
        let points: Vec<ClusteredPoint> = store::read_jsonl(&layout.clustered_points())?;
        Ok(Self::from_points(&points))
    }

    pub fn clusters(&self) -> &BTreeMap<ClusterId, Vec<String>> {
        &self.clusters
    }

    pub fn unassigned(&self) -> &[String] {
        &self.unassigned
    }

    /// Member sets regardless of which run-dependent id each cluster drew.
    pub fn membership_sets(&self) -> Vec<Vec<String>> {
        self.clusters.values().cloned().collect()
    }

    /// Render the compact form: a `Cluster {id}` header, one line of
    /// space-separated member keys, a blank line. Unassigned points get the
    /// same shape under an `Unassigned` header.
    pub fn render(&self, out: &mut impl Write) -> Result<(), ReportError> {
        for (id, members) in &self.clusters {
            writeln!(out, "Cluster {id}")?;
            writeln!(out, "{}", members.join(" "))?;
            writeln!(out)?;
        }
        if !self.unassigned.is_empty() {
            writeln!(out, "Unassigned")?;
            writeln!(out, "{}", self.unassigned.join(" "))?;
            writeln!(out)?;
        }
        Ok(())
    }

    /// Render with each member resolved to its record value, one
    /// `key<TAB>text` line per member.
    pub fn render_with_text(
        &self,
        out: &mut impl Write,
        layout: &OutputLayout,
    ) -> Result<(), ReportError> {
        let records: Vec<DocumentRecord> = store::read_jsonl(&layout.sentences())?;
        let texts: BTreeMap<&str, &str> = records
            .iter()
            .map(|r| (r.key.as_str(), r.value.as_str()))
            .collect();

        let write_members = |out: &mut dyn Write, members: &[String]| -> io::Result<()> {
            for member in members {
                let text = texts.get(member.as_str()).copied().unwrap_or("");
                writeln!(out, "{member}\t{text}")?;
            }
            Ok(())
        };

        for (id, members) in &self.clusters {
            writeln!(out, "Cluster {id}")?;
            write_members(&mut *out, members)?;
            writeln!(out)?;
        }
        if !self.unassigned.is_empty() {
            writeln!(out, "Unassigned")?;
            write_members(&mut *out, &self.unassigned)?;
            writeln!(out)?;
        }
        Ok(())
    }
}

fn sort_by_sentence_order(members: &mut [String]) {
    // Foreign keys (anything not sentence{N}) sort after real ones, by name
    members.sort_by(|a, b| {
        let ka = SentenceId::from_record_key(a);
        let kb = SentenceId::from_record_key(b);
        match (ka, kb) {
            (Some(a), Some(b)) => a.cmp(&b),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => a.cmp(b),
        }
    });
}
