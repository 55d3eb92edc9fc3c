pub mod contract;
pub mod doc_type;
pub mod dom;
pub mod legal;
pub mod text;
pub mod url;
