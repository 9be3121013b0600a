use conveyor_core::ResourceNames;
use serde::Serialize;

/// Renders the Terraform declarations and the variable file that feeds them.
///
/// The `.tf` templates never spell out a resource name: every name is a
/// `var.*` reference, and the values come from [`ResourceNames`], the same
/// struct the deploy pipeline addresses resources with.
pub struct TerraformGenerator<'a> {
    names: &'a ResourceNames,
    project: &'a str,
    artifact_path: &'a str,
    target: &'a str,
}

#[derive(Serialize)]
struct TfVars<'a> {
    #[serde(flatten)]
    names: &'a ResourceNames,
    project: &'a str,
    artifact_path: &'a str,
    architecture: &'static str,
}

impl<'a> TerraformGenerator<'a> {
    pub fn new(
        names: &'a ResourceNames,
        project: &'a str,
        artifact_path: &'a str,
        target: &'a str,
    ) -> Self {
        Self {
            names,
            project,
            artifact_path,
            target,
        }
    }

    /// Lambda architecture for the handler's target triple.
    pub fn architecture(&self) -> &'static str {
        if self.target.starts_with("aarch64") {
            "arm64"
        } else {
            "x86_64"
        }
    }

    /// `conveyor.auto.tfvars.json` body.
    pub fn render_tfvars(&self) -> Result<String, serde_json::Error> {
        let vars = TfVars {
            names: self.names,
            project: self.project,
            artifact_path: self.artifact_path,
            architecture: self.architecture(),
        };
        let mut out = serde_json::to_string_pretty(&vars)?;
        out.push('\n');
        Ok(out)
    }

    pub fn render_main(&self) -> String {
        MAIN_TF.to_owned()
    }

    pub fn render_variables(&self) -> String {
        VARIABLES_TF.to_owned()
    }

    pub fn render_outputs(&self) -> String {
        OUTPUTS_TF.to_owned()
    }
}

const VARIABLES_TF: &str = r#"# Generated by: conveyor infra init
# Values live in conveyor.auto.tfvars.json, rendered from conveyor.toml.

variable "region" {
  type = string
}

variable "project" {
  type = string
}

variable "function_name" {
  type = string
}

variable "bucket_name" {
  type = string
}

variable "artifact_path" {
  type        = string
  description = "Archive used when the function is first created; later code updates come from conveyor deploy."
}

variable "architecture" {
  type = string
}
"#;

const OUTPUTS_TF: &str = r#"# Generated by: conveyor infra init

output "distribution_id" {
  description = "Set as [cdn].distribution_id or CONVEYOR_DISTRIBUTION_ID."
  value       = aws_cloudfront_distribution.frontend.id
}

output "distribution_domain" {
  value = aws_cloudfront_distribution.frontend.domain_name
}

output "function_url" {
  description = "Set as [function].url or CONVEYOR_API_URL to enable deploy --verify."
  value       = aws_lambda_function_url.api.function_url
}
"#;

const MAIN_TF: &str = r#"# Generated by: conveyor infra init
terraform {
  required_providers {
    aws = {
      source  = "hashicorp/aws"
      version = "~> 5.0"
    }
  }
}

provider "aws" {
  region = var.region

  default_tags {
    tags = {
      Project   = var.project
      ManagedBy = "conveyor"
    }
  }
}

locals {
  adapter_layer = "arn:aws:lambda:${var.region}:753240598075:layer:LambdaAdapterLayer${var.architecture == "arm64" ? "Arm64" : "X86"}:24"
}

# ── API: Lambda function ──

data "aws_iam_policy_document" "lambda_assume" {
  statement {
    actions = ["sts:AssumeRole"]
    principals {
      type        = "Service"
      identifiers = ["lambda.amazonaws.com"]
    }
  }
}

resource "aws_iam_role" "api" {
  name               = "${var.function_name}-role"
  assume_role_policy = data.aws_iam_policy_document.lambda_assume.json
}

resource "aws_iam_role_policy_attachment" "api_logs" {
  role       = aws_iam_role.api.name
  policy_arn = "arn:aws:iam::aws:policy/service-role/AWSLambdaBasicExecutionRole"
}

resource "aws_lambda_function" "api" {
  function_name = var.function_name
  role          = aws_iam_role.api.arn
  runtime       = "provided.al2023"
  handler       = "bootstrap"
  architectures = [var.architecture]
  filename      = var.artifact_path
  layers        = [local.adapter_layer]
  memory_size   = 128
  timeout       = 10

  environment {
    variables = {
      PORT = "8080"
    }
  }

  # Code is published by `conveyor deploy`, not by Terraform.
  lifecycle {
    ignore_changes = [filename, source_code_hash]
  }
}

resource "aws_lambda_function_url" "api" {
  function_name      = aws_lambda_function.api.function_name
  authorization_type = "NONE"
}

# ── Frontend: S3 bucket behind CloudFront ──

resource "aws_s3_bucket" "frontend" {
  bucket = var.bucket_name
}

resource "aws_s3_bucket_public_access_block" "frontend" {
  bucket                  = aws_s3_bucket.frontend.id
  block_public_acls       = true
  block_public_policy     = true
  ignore_public_acls      = true
  restrict_public_buckets = true
}

resource "aws_cloudfront_origin_access_control" "frontend" {
  name                              = "${var.bucket_name}-oac"
  origin_access_control_origin_type = "s3"
  signing_behavior                  = "always"
  signing_protocol                  = "sigv4"
}

resource "aws_cloudfront_distribution" "frontend" {
  enabled             = true
  default_root_object = "index.html"

  origin {
    domain_name              = aws_s3_bucket.frontend.bucket_regional_domain_name
    origin_id                = "s3-${var.bucket_name}"
    origin_access_control_id = aws_cloudfront_origin_access_control.frontend.id
  }

  default_cache_behavior {
    target_origin_id       = "s3-${var.bucket_name}"
    viewer_protocol_policy = "redirect-to-https"
    allowed_methods        = ["GET", "HEAD"]
    cached_methods         = ["GET", "HEAD"]
    # Managed-CachingOptimized
    cache_policy_id = "658327ea-f89d-4fab-a63d-7e88639e58f6"
  }

  restrictions {
    geo_restriction {
      restriction_type = "none"
    }
  }

  viewer_certificate {
    cloudfront_default_certificate = true
  }
}

data "aws_iam_policy_document" "frontend_read" {
  statement {
    actions   = ["s3:GetObject"]
    resources = ["${aws_s3_bucket.frontend.arn}/*"]
    principals {
      type        = "Service"
      identifiers = ["cloudfront.amazonaws.com"]
    }
    condition {
      test     = "StringEquals"
      variable = "AWS:SourceArn"
      values   = [aws_cloudfront_distribution.frontend.arn]
    }
  }
}

resource "aws_s3_bucket_policy" "frontend" {
  bucket = aws_s3_bucket.frontend.id
  policy = data.aws_iam_policy_document.frontend_read.json
}
"#;
