mod common;
mod router;
