mod client_test;
mod tools_test;
