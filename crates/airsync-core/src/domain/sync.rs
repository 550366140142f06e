//! Sync round parsing and change accumulation
//!
//! A sync call may take several rounds when the server reports
//! `MoreAvailable`. Each round is parsed into typed [`ChangeRecord`]s for
//! the first collection; the [`SyncAccumulator`] appends them across rounds
//! and is rendered back to XML only once, when the merged `Commands`
//! element is spliced into the final round's document.

use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};
use serde::{Deserialize, Serialize};

use super::errors::AirSyncResult;
use super::response::RawResponse;
use crate::xml::{finish, next_event, text_of, write_event};

/// Collection status value meaning success
pub const STATUS_SUCCESS: &str = "1";

/// Kind of a server-side change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeKind {
    Add,
    Change,
    Delete,
    SoftDelete,
}

impl ChangeKind {
    pub fn element_name(&self) -> &'static str {
        match self {
            ChangeKind::Add => "Add",
            ChangeKind::Change => "Change",
            ChangeKind::Delete => "Delete",
            ChangeKind::SoftDelete => "SoftDelete",
        }
    }

    fn from_element(name: &[u8]) -> Option<Self> {
        match name {
            b"Add" => Some(ChangeKind::Add),
            b"Change" => Some(ChangeKind::Change),
            b"Delete" => Some(ChangeKind::Delete),
            b"SoftDelete" => Some(ChangeKind::SoftDelete),
            _ => None,
        }
    }
}

/// One entry of a collection's `Commands` element
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub kind: ChangeKind,
    pub server_id: Option<String>,
    pub client_id: Option<String>,
    /// The element as received, including its own tags
    pub raw_xml: String,
}

/// The first collection of one decoded sync response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncRound {
    /// Collection `Status`; `None` when the element is missing
    pub status: Option<String>,
    pub sync_key: Option<String>,
    pub collection_id: Option<String>,
    pub more_available: bool,
    /// Changes in arrival order
    pub changes: Vec<ChangeRecord>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Field {
    Status,
    SyncKey,
    CollectionId,
    ServerId,
    ClientId,
}

struct PendingChange {
    kind: ChangeKind,
    server_id: Option<String>,
    client_id: Option<String>,
    writer: Writer<Vec<u8>>,
}

impl SyncRound {
    /// Parses the first `Collection` of a sync response
    ///
    /// Returns `None` when the document has no collection at all.
    pub fn parse(xml: &str) -> AirSyncResult<Option<Self>> {
        let mut reader = Reader::from_str(xml);
        let mut path: Vec<Vec<u8>> = Vec::new();
        // Length of `path` just before the first Collection was pushed
        let mut level: Option<usize> = None;
        let mut round: Option<SyncRound> = None;
        let mut field: Option<(Field, String)> = None;
        let mut pending: Option<PendingChange> = None;

        loop {
            let event = next_event(&mut reader)?;
            if matches!(event, Event::Eof) {
                break;
            }

            if let Some(change) = pending.as_mut() {
                write_event(&mut change.writer, event.clone())?;
            }

            match event {
                Event::Start(ref e) | Event::Empty(ref e) => {
                    let empty = matches!(event, Event::Empty(_));
                    let name = e.local_name().as_ref().to_vec();
                    let depth = path.len();

                    match level {
                        None if name == b"Collection" => {
                            if empty {
                                round = Some(SyncRound::empty());
                                break;
                            }
                            level = Some(depth);
                            round = Some(SyncRound::empty());
                        }
                        Some(l) if depth == l + 1 => {
                            let target = match name.as_slice() {
                                b"Status" => Some(Field::Status),
                                b"SyncKey" => Some(Field::SyncKey),
                                b"CollectionId" => Some(Field::CollectionId),
                                b"MoreAvailable" => {
                                    if let Some(r) = round.as_mut() {
                                        r.more_available = true;
                                    }
                                    None
                                }
                                _ => None,
                            };
                            field = target.map(|f| (f, String::new()));
                        }
                        Some(l) if depth == l + 2 && path[l + 1] == b"Commands" => {
                            if let Some(kind) = ChangeKind::from_element(&name) {
                                let mut writer = Writer::new(Vec::new());
                                write_event(&mut writer, event.clone())?;
                                pending = Some(PendingChange {
                                    kind,
                                    server_id: None,
                                    client_id: None,
                                    writer,
                                });
                            }
                        }
                        Some(l) if depth == l + 3 && pending.is_some() => {
                            field = match name.as_slice() {
                                b"ServerId" => Some((Field::ServerId, String::new())),
                                b"ClientId" => Some((Field::ClientId, String::new())),
                                _ => None,
                            };
                        }
                        _ => {}
                    }

                    if empty {
                        if let Some((f, value)) = field.take() {
                            assign(round.as_mut(), pending.as_mut(), f, value);
                        }
                        if level.is_some_and(|l| depth == l + 2) {
                            if let Some(change) = pending.take() {
                                let record = change.finish()?;
                                if let Some(r) = round.as_mut() {
                                    r.changes.push(record);
                                }
                            }
                        }
                    } else {
                        path.push(name);
                    }
                }
                Event::Text(ref t) => {
                    if let Some((_, value)) = field.as_mut() {
                        value.push_str(&text_of(t)?);
                    }
                }
                Event::CData(ref c) => {
                    if let Some((_, value)) = field.as_mut() {
                        value.push_str(&String::from_utf8_lossy(c));
                    }
                }
                Event::End(_) => {
                    path.pop();
                    let depth = path.len();
                    if let Some(l) = level {
                        if let Some((f, value)) = field.take() {
                            assign(round.as_mut(), pending.as_mut(), f, value);
                        }
                        if depth == l + 2 {
                            if let Some(change) = pending.take() {
                                let record = change.finish()?;
                                if let Some(r) = round.as_mut() {
                                    r.changes.push(record);
                                }
                            }
                        }
                        if depth == l {
                            // Only the first collection is read
                            break;
                        }
                    }
                }
                _ => {}
            }
        }

        Ok(round)
    }

    fn empty() -> Self {
        Self {
            status: None,
            sync_key: None,
            collection_id: None,
            more_available: false,
            changes: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.as_deref().map(str::trim) == Some(STATUS_SUCCESS)
    }
}

impl PendingChange {
    fn finish(self) -> AirSyncResult<ChangeRecord> {
        Ok(ChangeRecord {
            kind: self.kind,
            server_id: self.server_id,
            client_id: self.client_id,
            raw_xml: finish(self.writer)?,
        })
    }
}

fn assign(round: Option<&mut SyncRound>, change: Option<&mut PendingChange>, field: Field, value: String) {
    let value = value.trim().to_string();
    match (field, round, change) {
        (Field::ServerId, _, Some(c)) => c.server_id = Some(value),
        (Field::ClientId, _, Some(c)) => c.client_id = Some(value),
        (Field::Status, Some(r), _) => r.status = Some(value),
        (Field::SyncKey, Some(r), _) => r.sync_key = Some(value),
        (Field::CollectionId, Some(r), _) => r.collection_id = Some(value),
        _ => {}
    }
}

/// Changes gathered over all rounds of one sync call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncAccumulator {
    pub adds: Vec<ChangeRecord>,
    pub changes: Vec<ChangeRecord>,
    pub deletes: Vec<ChangeRecord>,
    pub soft_deletes: Vec<ChangeRecord>,
    /// Kind and index into the per-kind list, in arrival order
    order: Vec<(ChangeKind, usize)>,
}

impl SyncAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: ChangeRecord) {
        let list = match record.kind {
            ChangeKind::Add => &mut self.adds,
            ChangeKind::Change => &mut self.changes,
            ChangeKind::Delete => &mut self.deletes,
            ChangeKind::SoftDelete => &mut self.soft_deletes,
        };
        self.order.push((record.kind, list.len()));
        list.push(record);
    }

    pub fn extend(&mut self, records: impl IntoIterator<Item = ChangeRecord>) {
        for record in records {
            self.push(record);
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// All records in arrival order
    pub fn iter(&self) -> impl Iterator<Item = &ChangeRecord> {
        self.order.iter().filter_map(|(kind, i)| {
            match kind {
                ChangeKind::Add => &self.adds,
                ChangeKind::Change => &self.changes,
                ChangeKind::Delete => &self.deletes,
                ChangeKind::SoftDelete => &self.soft_deletes,
            }
            .get(*i)
        })
    }

    /// Content of the merged `Commands` element
    pub fn render_commands(&self) -> String {
        self.iter().map(|r| r.raw_xml.as_str()).collect()
    }
}

/// Replaces the content of the first collection's `Commands` element with
/// `commands`, inserting the element when the collection has none
pub fn splice_commands(xml: &str, commands: &str) -> AirSyncResult<String> {
    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Vec::with_capacity(xml.len() + commands.len()));
    let mut depth = 0usize;
    // Depth and qualified name of the first Collection
    let mut collection: Option<(usize, String)> = None;
    let mut skip_depth = 0usize;
    let mut done = false;

    loop {
        let event = next_event(&mut reader)?;
        if skip_depth > 0 {
            match event {
                Event::Eof => break,
                Event::Start(_) => skip_depth += 1,
                Event::End(_) => skip_depth -= 1,
                _ => {}
            }
            if skip_depth == 0 {
                // End tag of the replaced Commands element
                depth -= 1;
                write_event(&mut writer, event)?;
            }
            continue;
        }

        match event {
            Event::Eof => break,
            Event::Start(ref e) if !done => {
                depth += 1;
                if collection.is_none() && e.local_name().as_ref() == b"Collection" {
                    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                    collection = Some((depth, name));
                } else if collection.as_ref().is_some_and(|(d, _)| d + 1 == depth)
                    && e.local_name().as_ref() == b"Commands"
                {
                    write_event(&mut writer, event.clone())?;
                    write_raw(&mut writer, commands);
                    skip_depth = 1;
                    done = true;
                    continue;
                }
            }
            Event::Start(_) => depth += 1,
            Event::Empty(ref e)
                if !done
                    && collection.as_ref().is_some_and(|(d, _)| *d == depth)
                    && e.local_name().as_ref() == b"Commands" =>
            {
                let start = e.clone().into_owned();
                let end = start.to_end().into_owned();
                write_event(&mut writer, Event::Start(start))?;
                write_raw(&mut writer, commands);
                write_event(&mut writer, Event::End(end))?;
                done = true;
                continue;
            }
            Event::End(_) => {
                if !done {
                    if let Some((d, name)) = collection.as_ref() {
                        if *d == depth {
                            if !commands.is_empty() {
                                let tag = qualified(name, "Commands");
                                write_event(&mut writer, Event::Start(BytesStart::new(tag.as_str())))?;
                                write_raw(&mut writer, commands);
                                write_event(&mut writer, Event::End(BytesEnd::new(tag.as_str())))?;
                            }
                            done = true;
                        }
                    }
                }
                depth = depth.saturating_sub(1);
            }
            _ => {}
        }
        write_event(&mut writer, event)?;
    }

    finish(writer)
}

fn write_raw(writer: &mut Writer<Vec<u8>>, content: &str) {
    writer.get_mut().extend_from_slice(content.as_bytes());
}

/// `local` with the namespace prefix of `sibling`, if any
fn qualified(sibling: &str, local: &str) -> String {
    match sibling.split_once(':') {
        Some((prefix, _)) => format!("{prefix}:{local}"),
        None => local.to_string(),
    }
}

/// Terminal state of a sync call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncStatus {
    /// Every round succeeded and the last one had no more data
    Completed,
    /// A round returned a non-success collection status; no merge happened
    /// for that round
    Failed(String),
    /// The response had no collection (or no collection status)
    NoCollection,
}

/// Result of a complete sync call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOutcome {
    /// Final round's response, with the merged `Commands` spliced in when
    /// the call completed
    pub response: RawResponse,
    pub changes: SyncAccumulator,
    pub rounds: u32,
    pub status: SyncStatus,
    /// Last sync key returned by the server
    pub sync_key: Option<String>,
}

impl SyncOutcome {
    pub fn is_completed(&self) -> bool {
        self.status == SyncStatus::Completed
    }
}
