//! Loaded networks and the edit/preview cycle of the mapping editor.

use log::{debug, info};

use super::config::StyleConfig;
use super::convert::{Result, convert};
use super::lookup::LookupTable;
use super::mappings::{EditOutcome, MappingEdit};
use super::types::{Network, NetworkId};

/// Networks loaded side by side, sharing one lookup table.
#[derive(Debug, Default)]
pub struct Session {
	lookup: LookupTable,
	config: StyleConfig,
	networks: Vec<Network>,
	next_id: u32,
}

impl Session {
	pub fn new(lookup: LookupTable, config: StyleConfig) -> Self {
		Self {
			lookup,
			config,
			networks: Vec::new(),
			next_id: 0,
		}
	}

	/// Session using the bundled lookup table and default configuration.
	pub fn with_builtin_lookup() -> Self {
		Self::new(LookupTable::builtin(), StyleConfig::default())
	}

	pub fn lookup(&self) -> &LookupTable {
		&self.lookup
	}

	/// Convert a document and keep the resulting network.
	pub fn load(&mut self, document: &str, filename: &str) -> Result<NetworkId> {
		let mut network = convert(document, filename, &self.lookup, &self.config)?;
		let id = NetworkId(self.next_id);
		self.next_id += 1;
		network.id = id;
		self.networks.push(network);
		info!("cx-vizmap: loaded {} as network {}", filename, id.0);
		Ok(id)
	}

	pub fn networks(&self) -> &[Network] {
		&self.networks
	}

	pub fn network(&self, id: NetworkId) -> Option<&Network> {
		self.networks.iter().find(|n| n.id == id)
	}

	pub fn network_mut(&mut self, id: NetworkId) -> Option<&mut Network> {
		self.networks.iter_mut().find(|n| n.id == id)
	}

	/// Drop a network; ids of the others stay valid.
	pub fn remove(&mut self, id: NetworkId) -> Option<Network> {
		let pos = self.networks.iter().position(|n| n.id == id)?;
		Some(self.networks.remove(pos))
	}

	/// Editor over one network.
	pub fn editor(&mut self, id: NetworkId) -> Option<MappingEditor<'_>> {
		self.network_mut(id).map(MappingEditor::new)
	}
}

/// Where the editor is in its edit cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EditStage {
	/// No edit pending.
	Viewing,
	/// An edit is staged but not applied.
	Editing,
	/// The staged edit is applied on top of a snapshot.
	Preview,
}

/// Stages a mapping edit, previews it and commits or discards it.
///
/// A preview applies the edit for real and keeps a snapshot of the network to
/// go back to; ending the preview or discarding restores it.
#[derive(Debug)]
pub struct MappingEditor<'a> {
	network: &'a mut Network,
	snapshot: Option<Network>,
	pending: Option<MappingEdit>,
	previewed: Option<EditOutcome>,
	stage: EditStage,
}

impl<'a> MappingEditor<'a> {
	pub fn new(network: &'a mut Network) -> Self {
		Self {
			network,
			snapshot: None,
			pending: None,
			previewed: None,
			stage: EditStage::Viewing,
		}
	}

	pub fn stage(&self) -> EditStage {
		self.stage
	}

	pub fn network(&self) -> &Network {
		self.network
	}

	/// Stage an edit, replacing any staged one. An active preview is undone first.
	pub fn set_pending(&mut self, edit: MappingEdit) {
		self.restore();
		self.pending = Some(edit);
		self.stage = EditStage::Editing;
	}

	/// Apply the staged edit temporarily.
	pub fn flash_preview(&mut self) -> Option<EditOutcome> {
		if self.stage != EditStage::Editing {
			return None;
		}
		let edit = self.pending.clone()?;
		self.snapshot = Some(self.network.clone());
		let outcome = self.network.apply(edit);
		self.previewed = Some(outcome.clone());
		self.stage = EditStage::Preview;
		Some(outcome)
	}

	/// Undo the preview and go back to editing.
	pub fn end_preview(&mut self) -> bool {
		if self.stage != EditStage::Preview {
			return false;
		}
		self.restore();
		self.stage = EditStage::Editing;
		true
	}

	/// Make the staged edit permanent.
	pub fn commit(&mut self) -> Option<EditOutcome> {
		let outcome = match self.stage {
			EditStage::Viewing => return None,
			EditStage::Editing => self.pending.take().map(|edit| self.network.apply(edit)),
			EditStage::Preview => {
				self.snapshot = None;
				self.pending = None;
				self.previewed.take()
			}
		};
		debug!("cx-vizmap: committed edit on network {}", self.network.id.0);
		self.stage = EditStage::Viewing;
		outcome
	}

	/// Drop the staged edit, undoing any preview.
	pub fn discard(&mut self) {
		self.restore();
		self.pending = None;
		self.stage = EditStage::Viewing;
	}

	fn restore(&mut self) {
		if let Some(snapshot) = self.snapshot.take() {
			*self.network = snapshot;
		}
		self.previewed = None;
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::engine::mappings::{DiscreteEntry, DiscreteMappingRequest};
	use crate::engine::types::ElementGroup;

	const DOC: &str = r#"[
		{"nodes": [{"@id": 1}, {"@id": 2}]},
		{"nodeAttributes": [{"po": 1, "n": "type", "v": "A"}, {"po": 2, "n": "type", "v": "B"}]}
	]"#;

	fn shape_edit() -> MappingEdit {
		MappingEdit::AddDiscrete(DiscreteMappingRequest {
			group: ElementGroup::Node,
			classifier: "type".to_string(),
			css_key: "shape".to_string(),
			entries: vec![DiscreteEntry::new("A", "diamond")],
		})
	}

	#[test]
	fn networks_keep_their_ids() {
		let mut session = Session::with_builtin_lookup();
		let a = session.load(DOC, "a.cx").unwrap();
		let b = session.load(DOC, "b.cx").unwrap();
		assert!(session.load("{}", "c.cx").is_err());
		assert!(session.remove(a).is_some());
		assert_eq!(session.network(b).unwrap().filename, "b.cx");
		assert!(session.network(a).is_none());
		assert_eq!(session.networks().len(), 1);
	}

	#[test]
	fn preview_then_end_restores_network() {
		let mut session = Session::with_builtin_lookup();
		let id = session.load(DOC, "a.cx").unwrap();
		let before = session.network(id).unwrap().style.clone();

		let mut editor = session.editor(id).unwrap();
		editor.set_pending(shape_edit());
		assert_eq!(editor.stage(), EditStage::Editing);
		assert!(matches!(editor.flash_preview(), Some(EditOutcome::Mapped { .. })));
		assert!(editor.network().rule(".node_type_a").is_some());
		assert!(editor.end_preview());
		assert_eq!(editor.stage(), EditStage::Editing);
		assert_eq!(editor.network().style, before);
		editor.discard();
		assert_eq!(editor.stage(), EditStage::Viewing);
		assert!(editor.commit().is_none());
	}

	#[test]
	fn commit_keeps_previewed_edit() {
		let mut session = Session::with_builtin_lookup();
		let id = session.load(DOC, "a.cx").unwrap();
		let mut editor = session.editor(id).unwrap();
		editor.set_pending(shape_edit());
		editor.flash_preview();
		assert!(matches!(editor.commit(), Some(EditOutcome::Mapped { .. })));
		assert_eq!(editor.stage(), EditStage::Viewing);
		let net = session.network(id).unwrap();
		assert_eq!(net.rule(".node_type_a").unwrap().style["shape"], "diamond");
		assert_eq!(net.mappings.nodes_discrete.len(), 1);
	}

	#[test]
	fn commit_without_preview_applies() {
		let mut session = Session::with_builtin_lookup();
		let id = session.load(DOC, "a.cx").unwrap();
		let mut editor = session.editor(id).unwrap();
		editor.set_pending(shape_edit());
		assert!(editor.commit().is_some());
		assert_eq!(session.network(id).unwrap().mappings.nodes_discrete.len(), 1);
	}
}
