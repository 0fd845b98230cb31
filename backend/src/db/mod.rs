pub mod dynamodb_repository;
