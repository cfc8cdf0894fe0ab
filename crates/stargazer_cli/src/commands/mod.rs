pub(crate) mod collect;
