pub mod mc_table;
