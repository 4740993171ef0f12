// Application layer: BibTeX reading and the concrete pipeline wired from the ports.

pub mod bibtex;
pub mod pipelines;
