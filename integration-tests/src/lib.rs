pub mod test_runners;
