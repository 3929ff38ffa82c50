pub(crate) mod count;
pub(crate) mod meta;
