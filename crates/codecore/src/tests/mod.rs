mod collections;
mod utf8;
