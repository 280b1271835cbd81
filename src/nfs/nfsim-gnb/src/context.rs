//! gNodeB Context Management
//!
//! Radio node state: a fixed set of cells, the UEs attached to the node and
//! the traffic seen on the radio side.

use crate::error::{GnbError, GnbResult};
use nfsim_core::{BoundedMap, BoundedVec, CellId, GnbId, GnbState, NfInstance, NfType, UeId};
use rand::Rng;
use std::fmt::Write;

/// Maximum number of cells per gNodeB
pub const MAX_CELLS_PER_GNB: usize = 3;
/// Maximum number of UEs attached to one gNodeB
pub const MAX_UES_PER_GNB: usize = 1000;

/// Signal metrics ranges for a newly added cell
const RSRP_BASE_DBM: f32 = -70.0;
const RSRP_SPAN: u32 = 30;
const RSRQ_BASE_DB: f32 = -5.0;
const RSRQ_SPAN: u32 = 15;

/// Cell served by a gNodeB. Immutable once added.
#[derive(Debug, Clone, PartialEq)]
pub struct CellInfo {
    pub cell_id: CellId,
    pub pci: u32,
    /// Carrier frequency in MHz
    pub frequency: u32,
    /// Reference signal received power (dBm)
    pub rsrp: f32,
    /// Reference signal received quality (dB)
    pub rsrq: f32,
}

/// gNodeB Context
pub struct GnbContext {
    pub(crate) instance: NfInstance,
    gnb_id: GnbId,
    location: String,
    state: GnbState,
    cells: BoundedVec<CellInfo>,
    /// Connected UEs and the cell each one camps on (`None` if the node had no cells)
    connected_ues: BoundedMap<UeId, Option<CellId>>,
    total_ul_traffic: u64,
    total_dl_traffic: u64,
}

impl GnbContext {
    /// Create a new gNodeB in the `Active` state
    pub fn new(gnb_id: GnbId, location: impl Into<String>) -> Self {
        let location = location.into();
        log::info!("Creating gNodeB: ID={}, Location={}", gnb_id, location);
        Self {
            instance: NfInstance::new(NfType::Ran, format!("gNB-{}", gnb_id)),
            gnb_id,
            location,
            state: GnbState::Active,
            cells: BoundedVec::new(MAX_CELLS_PER_GNB),
            connected_ues: BoundedMap::new(MAX_UES_PER_GNB),
            total_ul_traffic: 0,
            total_dl_traffic: 0,
        }
    }

    pub fn gnb_id(&self) -> GnbId {
        self.gnb_id
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn state(&self) -> GnbState {
        self.state
    }

    /// Add a cell with random signal metrics
    pub fn add_cell(&mut self, cell_id: CellId, pci: u32, frequency: u32) -> GnbResult<()> {
        let mut rng = rand::rng();
        let cell = CellInfo {
            cell_id,
            pci,
            frequency,
            rsrp: RSRP_BASE_DBM + rng.random_range(0..RSRP_SPAN) as f32,
            rsrq: RSRQ_BASE_DB + rng.random_range(0..RSRQ_SPAN) as f32,
        };

        if let Err(e) = self.cells.push(cell) {
            log::warn!("gNodeB {} already has maximum cells", self.gnb_id);
            return Err(GnbError::CellCapacityExceeded {
                gnb_id: self.gnb_id,
                capacity: e.capacity,
            });
        }

        log::info!(
            "gNodeB {} added cell: ID={}, PCI={}, Freq={}MHz",
            self.gnb_id,
            cell_id,
            pci,
            frequency
        );
        Ok(())
    }

    pub fn cell(&self, cell_id: CellId) -> Option<&CellInfo> {
        self.cells.iter().find(|cell| cell.cell_id == cell_id)
    }

    pub fn cells(&self) -> &[CellInfo] {
        self.cells.as_slice()
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Attach a UE to the first cell. Returns the cell chosen.
    pub fn connect_ue(&mut self, ue_id: UeId) -> GnbResult<Option<CellId>> {
        if self.connected_ues.contains_key(&ue_id) {
            log::warn!("UE {} already connected to gNodeB {}", ue_id, self.gnb_id);
            return Err(GnbError::AlreadyConnected {
                gnb_id: self.gnb_id,
                ue_id,
            });
        }

        let cell_id = self.cells.first().map(|cell| cell.cell_id);
        if let Err(e) = self.connected_ues.insert(ue_id, cell_id) {
            log::warn!("gNodeB {} at maximum capacity", self.gnb_id);
            return Err(GnbError::UeCapacityExceeded {
                gnb_id: self.gnb_id,
                capacity: e.capacity,
            });
        }

        log::info!(
            "UE {} connected to gNodeB {} (Cell={}, Total UEs={})",
            ue_id,
            self.gnb_id,
            cell_id.map_or_else(|| "none".to_string(), |c| c.to_string()),
            self.connected_ues.len()
        );
        Ok(cell_id)
    }

    /// Detach a UE. Returns the cell it was on, or `None` if it was not connected.
    pub fn disconnect_ue(&mut self, ue_id: UeId) -> Option<Option<CellId>> {
        let cell_id = self.connected_ues.remove(&ue_id)?;
        log::info!("UE {} disconnected from gNodeB {}", ue_id, self.gnb_id);
        Some(cell_id)
    }

    pub fn is_ue_connected(&self, ue_id: UeId) -> bool {
        self.connected_ues.contains_key(&ue_id)
    }

    pub fn connected_ue_count(&self) -> usize {
        self.connected_ues.len()
    }

    /// Number of UEs camping on `cell_id`
    pub fn connected_ue_count_in_cell(&self, cell_id: CellId) -> usize {
        self.connected_ues
            .values()
            .filter(|cell| **cell == Some(cell_id))
            .count()
    }

    /// Change state. Returns false if the state was already `new_state`.
    pub fn set_state(&mut self, new_state: GnbState) -> bool {
        if self.state == new_state {
            return false;
        }
        log::debug!(
            "gNodeB {} state transition: {} -> {}",
            self.gnb_id,
            self.state,
            new_state
        );
        self.state = new_state;
        true
    }

    pub fn update_traffic(&mut self, ul_bytes: u32, dl_bytes: u32) {
        self.total_ul_traffic += u64::from(ul_bytes);
        self.total_dl_traffic += u64::from(dl_bytes);
    }

    pub fn total_ul_traffic(&self) -> u64 {
        self.total_ul_traffic
    }

    pub fn total_dl_traffic(&self) -> u64 {
        self.total_dl_traffic
    }

    pub fn mean_rsrp(&self, cell_id: CellId) -> Option<f32> {
        self.cell(cell_id).map(|cell| cell.rsrp)
    }

    pub fn mean_rsrq(&self, cell_id: CellId) -> Option<f32> {
        self.cell(cell_id).map(|cell| cell.rsrq)
    }

    /// One-line summary
    pub fn detailed_status(&self) -> String {
        format!(
            "gNB({}) - {} | Location={} | UEs={} | Cells={}",
            self.gnb_id,
            self.state,
            self.location,
            self.connected_ues.len(),
            self.cells.len()
        )
    }

    pub fn statistics(&self) -> String {
        format!(
            "gNodeB {} Statistics:\n  UL Traffic: {} bytes\n  DL Traffic: {} bytes\n  Total Traffic: {} bytes\n",
            self.gnb_id,
            self.total_ul_traffic,
            self.total_dl_traffic,
            self.total_ul_traffic + self.total_dl_traffic
        )
    }

    /// Multi-line description including every cell
    pub fn info_report(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "================== gNodeB Information ==================");
        let _ = writeln!(out, "gNodeB ID:          {}", self.gnb_id);
        let _ = writeln!(out, "Location:           {}", self.location);
        let _ = writeln!(out, "State:              {}", self.state);
        let _ = writeln!(out, "Number of Cells:    {}", self.cells.len());
        let _ = writeln!(out, "Connected UEs:      {}", self.connected_ues.len());
        let _ = writeln!(out, "Total UL Traffic:   {} bytes", self.total_ul_traffic);
        let _ = writeln!(out, "Total DL Traffic:   {} bytes", self.total_dl_traffic);
        if !self.cells.is_empty() {
            let _ = writeln!(out, "\nCell Information:");
            for cell in &self.cells {
                let _ = writeln!(
                    out,
                    "  Cell ID={} | PCI={} | Freq={}MHz | RSRP={:.1}dBm | RSRQ={:.1}dB",
                    cell.cell_id, cell.pci, cell.frequency, cell.rsrp, cell.rsrq
                );
            }
        }
        let _ = writeln!(out, "=======================================================");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gnb_new() {
        let _ = env_logger::try_init();
        let gnb = GnbContext::new(2000, "NewYork_gNB_0");
        assert_eq!(gnb.gnb_id(), 2000);
        assert_eq!(gnb.location(), "NewYork_gNB_0");
        assert_eq!(gnb.state(), GnbState::Active);
        assert_eq!(gnb.cell_count(), 0);
    }

    #[test]
    fn test_add_cell_capacity_and_metrics() {
        let mut gnb = GnbContext::new(2000, "loc");
        for j in 0..3 {
            gnb.add_cell(200_000 + j, 100 + j, 3500 + j * 50).unwrap();
        }
        assert_eq!(
            gnb.add_cell(200_003, 103, 3650),
            Err(GnbError::CellCapacityExceeded {
                gnb_id: 2000,
                capacity: 3
            })
        );
        assert_eq!(gnb.cell_count(), 3);
        assert!(gnb.cell(200_003).is_none());

        for cell in gnb.cells() {
            assert!((-70.0..=-41.0).contains(&cell.rsrp));
            assert!((-5.0..=9.0).contains(&cell.rsrq));
        }
        assert_eq!(gnb.mean_rsrp(200_001), gnb.cell(200_001).map(|c| c.rsrp));
        assert_eq!(gnb.mean_rsrq(999), None);
    }

    #[test]
    fn test_connect_ue_first_cell() {
        let mut gnb = GnbContext::new(2000, "loc");
        assert_eq!(gnb.connect_ue(1), Ok(None));

        gnb.add_cell(10, 1, 3500).unwrap();
        gnb.add_cell(11, 2, 3550).unwrap();
        assert_eq!(gnb.connect_ue(2), Ok(Some(10)));
        assert_eq!(gnb.connected_ue_count_in_cell(10), 1);
        assert_eq!(gnb.connected_ue_count_in_cell(11), 0);

        assert_eq!(
            gnb.connect_ue(2),
            Err(GnbError::AlreadyConnected {
                gnb_id: 2000,
                ue_id: 2
            })
        );
        assert_eq!(gnb.connected_ue_count(), 2);
    }

    #[test]
    fn test_connect_ue_capacity() {
        let mut gnb = GnbContext::new(1, "loc");
        for ue in 0..MAX_UES_PER_GNB as u32 {
            gnb.connect_ue(ue).unwrap();
        }
        assert_eq!(
            gnb.connect_ue(5000),
            Err(GnbError::UeCapacityExceeded {
                gnb_id: 1,
                capacity: 1000
            })
        );
        assert!(!gnb.is_ue_connected(5000));

        gnb.disconnect_ue(0);
        assert!(gnb.connect_ue(5000).is_ok());
    }

    #[test]
    fn test_disconnect_ue() {
        let mut gnb = GnbContext::new(1, "loc");
        gnb.add_cell(10, 1, 3500).unwrap();
        gnb.connect_ue(7).unwrap();

        assert_eq!(gnb.disconnect_ue(7), Some(Some(10)));
        assert!(!gnb.is_ue_connected(7));
        assert_eq!(gnb.disconnect_ue(7), None);
    }

    #[test]
    fn test_set_state() {
        let mut gnb = GnbContext::new(1, "loc");
        assert!(!gnb.set_state(GnbState::Active));
        assert!(gnb.set_state(GnbState::Maintenance));
        assert!(gnb.set_state(GnbState::Idle));
        assert!(gnb.set_state(GnbState::Unavailable));
        assert_eq!(gnb.state(), GnbState::Unavailable);
    }

    #[test]
    fn test_traffic_and_reports() {
        let mut gnb = GnbContext::new(2000, "NewYork_gNB_0");
        gnb.add_cell(10, 1, 3500).unwrap();
        gnb.update_traffic(2048, 0);
        gnb.update_traffic(1000, 4096);
        assert_eq!(gnb.total_ul_traffic(), 3048);
        assert_eq!(gnb.total_dl_traffic(), 4096);

        assert_eq!(
            gnb.detailed_status(),
            "gNB(2000) - ACTIVE | Location=NewYork_gNB_0 | UEs=0 | Cells=1"
        );
        assert!(gnb.statistics().contains("Total Traffic: 7144 bytes"));
        assert!(gnb.info_report().contains("Cell ID=10 | PCI=1 | Freq=3500MHz"));
    }
}
