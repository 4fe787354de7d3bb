use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

use anyhow::Result;
use eframe::egui;

use crate::data::element::write_element_dataset;
use crate::data::h5;
use crate::data::loader::{load_folder, LoadedTile};
use crate::data::model::ElementDataset;

// ---------------------------------------------------------------------------
// Background jobs
// ---------------------------------------------------------------------------

/// What a background write produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteKind {
    Hdf5,
    Elements,
}

impl WriteKind {
    pub fn label(self) -> &'static str {
        match self {
            WriteKind::Hdf5 => "HDF5",
            WriteKind::Elements => "Element",
        }
    }
}

/// Messages sent from worker threads back to the UI thread.
#[derive(Debug)]
pub enum WorkerEvent {
    Loaded {
        name: String,
        result: Result<LoadedTile>,
    },
    Written {
        name: String,
        kind: WriteKind,
        result: Result<()>,
    },
}

/// Runs file I/O off the UI thread; results arrive through [`Worker::drain`].
pub struct Worker {
    tx: Sender<WorkerEvent>,
    rx: Receiver<WorkerEvent>,
    repaint: Option<egui::Context>,
}

impl Worker {
    pub fn new(repaint: Option<egui::Context>) -> Self {
        let (tx, rx) = mpsc::channel();
        Self { tx, rx, repaint }
    }

    fn spawn<F>(&self, job: F)
    where
        F: FnOnce() -> WorkerEvent + Send + 'static,
    {
        let tx = self.tx.clone();
        let repaint = self.repaint.clone();
        thread::spawn(move || {
            // The receiver only goes away when the app is closing.
            let _ = tx.send(job());
            if let Some(ctx) = repaint {
                ctx.request_repaint();
            }
        });
    }

    /// Load one tile folder.
    pub fn load(&self, name: String, folder: PathBuf) {
        log::info!("Loading {name} from {}", folder.display());
        self.spawn(move || {
            let result = load_folder(&name, &folder);
            WorkerEvent::Loaded { name, result }
        });
    }

    /// Write a dataset as a single HDF5 file.
    pub fn write_hdf5(&self, name: String, path: PathBuf, dataset: ElementDataset, compression: u8) {
        log::info!("Writing {name} to {}", path.display());
        self.spawn(move || {
            let result = h5::write_all_datasets(&path, &dataset, compression);
            WorkerEvent::Written {
                name,
                kind: WriteKind::Hdf5,
                result,
            }
        });
    }

    /// Write a dataset as one element CSV per map.
    pub fn write_elements(&self, name: String, dir: PathBuf, dataset: ElementDataset) {
        log::info!("Writing {name} element files to {}", dir.display());
        self.spawn(move || {
            let result = write_element_dataset(&dir, &name, &dataset);
            WorkerEvent::Written {
                name,
                kind: WriteKind::Elements,
                result,
            }
        });
    }

    /// All events received so far, without blocking.
    pub fn drain(&self) -> Vec<WorkerEvent> {
        self.rx.try_iter().collect()
    }

    /// Block for the next event.
    #[cfg(test)]
    pub fn recv(&self) -> Option<WorkerEvent> {
        self.rx
            .recv_timeout(std::time::Duration::from_secs(10))
            .ok()
    }
}
