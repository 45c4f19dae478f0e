pub mod verse_request;
