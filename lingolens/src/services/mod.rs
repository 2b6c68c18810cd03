mod retrieval;

pub use retrieval::RetrievalService;
