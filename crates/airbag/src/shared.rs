// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

/// Marks a builder whose required properties are all configured.
#[non_exhaustive]
#[derive(Debug)]
pub struct Set;

/// Marks a builder that still lacks a required property.
#[non_exhaustive]
#[derive(Debug)]
pub struct NotSet;
