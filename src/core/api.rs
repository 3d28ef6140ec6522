// Copyright (c) 2021 Tangram Robotics Inc. - All Rights Reserved
// Unauthorized copying of this file, via any medium is strictly prohibited
// Proprietary and confidential
// ----------------------------

//! Cloudant API calls: single requests and paged streams.

pub mod cloudant;
pub mod streaming;
