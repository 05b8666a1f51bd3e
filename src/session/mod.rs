pub(crate) mod busy;
pub(crate) mod editor;
pub(crate) mod orchestrator;
