/*! Use-def analysis over a decoded control-flow graph.
 *
 * The driver walks the graph one strongly connected component at a time, applying each
 * instruction's semantics to a working set of "which instruction last wrote this register or
 * memory slot" facts. Every visited instruction ends up with a state recording the value trees it
 * defines and the earlier states its reads may have come from.
 */

pub mod config;
pub mod dataflow;
pub mod def_use;
mod handlers;
pub mod lists;
pub mod location;
pub mod order;
pub mod state;
pub mod usedef;
pub mod working_set;

pub use config::{AnalysisOptions, UDConfiguration, DEFAULT_LEVEL};
pub use dataflow::UseDefAnalysis;
pub use def_use::{DefUseChains, Use, UseKind};
pub use lists::{DefList, MemOrigin, MemOriginList, RefList};
pub use location::MemLocation;
pub use order::SccOrder;
pub use state::{StateId, StateKind, UDState};
pub use usedef::UseDef;
pub use working_set::UDWorkingSet;
