// SPDX-FileCopyrightText: 2026 GSI Helmholtzzentrum f. Schwerionenforschung GmbH, Darmstadt, Germany
// SPDX-License-Identifier: LGPL-3.0-or-later

//! Slurm integration: inspecting the job queue of one user.

pub mod squeue;

pub use squeue::{QueueInspector, Squeue};
