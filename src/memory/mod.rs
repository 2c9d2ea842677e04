//! 记忆层：程序性（工具目录）、情节（每轮经历）、语义（实体知识），共用相似度索引

pub mod episodic;
pub mod procedural;
pub mod semantic;
pub mod tokenizer;
pub mod vector_index;

pub use episodic::{Episode, EpisodicMemory};
pub use procedural::ProceduralMemory;
pub use semantic::{Fact, SemanticMemory};
pub use vector_index::{cosine_similarity, VectorIndex};
