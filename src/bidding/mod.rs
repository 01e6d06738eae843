pub mod resolver;
pub mod validator;
