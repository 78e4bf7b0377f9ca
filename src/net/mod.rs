//! # Petri 网核心定义（Place/Transition Net）
//!
//! 库所集合 `P` 按 id 的字典序排列，标识 `M ∈ ℤ^{|P|}` 的规范文本形式为
//! `(M[p1]|M[p2]|...|M[pn])`。弧允许平行重复，每一条平行弧在发生时各自
//! 消耗或产生一个 token：
//!
//! * 迁移 `t` **激活** 当且仅当其每个输入库所 `p` 满足 `M[p] ≥ 1`；
//!   没有输入弧的迁移总是激活的；
//! * 迁移 **发生** 后 `M'[p] = M[p] - Pre[p, t] + Post[p, t]`，
//!   其中 `Pre`/`Post` 为平行弧的条数。
//!
//! ## 示例
//!
//! ```rust
//! use pnbound::net::*;
//!
//! let mut net = Net::empty();
//! net.add_place("p0").unwrap();
//! net.add_place("p1").unwrap();
//! net.add_transition("t0").unwrap();
//! net.add_arc("a0", "p0", "t0").unwrap();
//! net.add_arc("a1", "t0", "p1").unwrap();
//! net.set_initial_marking("p0", 1).unwrap();
//! net.connect_arcs().unwrap();
//!
//! assert_eq!(net.marking().to_string(), "(1|0)");
//! net.fire("t0").unwrap();
//! assert_eq!(net.marking().to_string(), "(0|1)");
//! ```

pub mod core;
pub mod ids;
pub mod incidence;
pub mod index_vec;
pub mod io;
pub mod structure;

pub use self::core::Net;
pub use ids::{ArcId, PlaceId, TransitionId};
pub use incidence::Incidence;
pub use index_vec::{Idx, IndexVec};
pub use io::{ArcDef, NetDefinition, PlaceDef, TransitionDef};
pub use structure::{Arc, ArcDirection, ArcEnds, Marking, NodeRef, Place, Tokens, Transition};
