pub(crate) mod atomic;
