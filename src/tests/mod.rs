mod helper;
mod login;
mod root;
