pub mod housing;
